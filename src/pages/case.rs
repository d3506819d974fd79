use tracing::info;

use crate::config::PortalSettings;
use crate::error::{Error, Result};
use crate::page::{PageContext, Screen};
use crate::pages::form::FormPage;
use crate::session::Locator;

/// Case type search: three dependent dropdowns and a search button.
pub struct CaseSelectionPage<'a> {
    ctx: &'a PageContext,
}

impl<'a> CaseSelectionPage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    fn search_button() -> Locator {
        Locator::button_text("Űrlap keresés")
    }

    fn role_select() -> Locator {
        Locator::name("kepviselet.szerepkor")
    }

    fn sector_select() -> Locator {
        Locator::name("sector")
    }

    fn case_type_select() -> Locator {
        Locator::name("caseType")
    }

    /// Pick role, sector and case type by their visible labels, in that
    /// order since each list is populated from the previous choice, then
    /// search.
    pub async fn select_case(self, portal: &PortalSettings) -> Result<CaseResultsPage<'a>> {
        let choices = [
            (Self::role_select(), portal.role.as_str()),
            (Self::sector_select(), portal.sector.as_str()),
            (Self::case_type_select(), portal.case_type.as_str()),
        ];
        for (select, label) in &choices {
            info!(select = %select, "Selecting '{label}'");
            self.ctx.find(select).await?.select_by_label(label).await?;
        }
        self.ctx.find(&Self::search_button()).await?.click().await?;
        Ok(CaseResultsPage::new(self.ctx))
    }
}

impl Screen for CaseSelectionPage<'_> {
    fn name(&self) -> &'static str {
        "Ügyindítás"
    }

    fn readiness(&self) -> Locator {
        Self::search_button()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}

/// Search results, one "fill online" button per form revision.
pub struct CaseResultsPage<'a> {
    ctx: &'a PageContext,
}

impl<'a> CaseResultsPage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    pub fn fill_online_button() -> Locator {
        Locator::button_text("Online kitöltés")
    }

    /// Open the last listed form; later entries are the newer revisions.
    pub async fn open_latest_form(self) -> Result<FormPage<'a>> {
        let locator = Self::fill_online_button();
        let mut buttons = self.ctx.find_all(&locator).await?;
        let count = buttons.len();
        let latest = buttons
            .pop()
            .ok_or_else(|| Error::ElementNotFound(locator.to_string()))?;
        info!(candidates = count, "Opening the latest form revision");
        latest.click().await?;
        Ok(FormPage::new(self.ctx))
    }
}

impl Screen for CaseResultsPage<'_> {
    fn name(&self) -> &'static str {
        "Ügyindítás találatok"
    }

    fn readiness(&self) -> Locator {
        Self::fill_online_button()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}
