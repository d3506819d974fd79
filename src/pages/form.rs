use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::dialog::{is_progress_header, wait_out_progress, Overlay, OverlayKind};
use crate::error::{Error, Result};
use crate::fill::{fill_fields, Chapter, ChapterSet};
use crate::page::{PageContext, Screen};
use crate::pages::attachments::AttachmentsPage;
use crate::session::Locator;
use crate::workflow::SubmissionVerdict;

/// Body of the informational alert shown on every form load when the
/// taxpayer has no standing delegation on file.
pub const KNOWN_ALERT_TEXT: &str = "Az Alaprendelkezés lekérdezése eredménytelen volt";

const KNOWN_ALERT_BUTTON: &str = "Bezárás";
const CONFIRM_BUTTON: &str = "Igen";

/// What [`FormPage::dismiss_known_alert`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertDisposition {
    NotShown,
    Dismissed,
    /// An alert with other content, left open for the operator to review.
    Unexpected(String),
}

/// The multi-chapter form, rendered inside an iframe.
pub struct FormPage<'a> {
    ctx: &'a PageContext,
}

impl<'a> FormPage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    fn frame() -> Locator {
        Locator::id("iform-iframe")
    }

    fn next_chapter_link() -> Locator {
        Locator::partial_link_text("Következő fejezet")
    }

    fn more_actions_link() -> Locator {
        Locator::partial_link_text("További műveletek")
    }

    fn submit_link() -> Locator {
        Locator::partial_link_text("Az űrlap beküldése")
    }

    /// The form shows a progress modal while it loads its data. Give it a
    /// moment to appear and, if it does, wait until it is gone.
    pub async fn wait_for_progress_overlay(&self) -> Result<()> {
        let appeared =
            Overlay::appear_within(self.ctx, OverlayKind::Modal, self.ctx.timeouts().dialog_visible())
                .await?;
        match appeared {
            Some(overlay) => wait_out_progress(self.ctx, &overlay).await,
            None => {
                info!("No modal shown after form load");
                Ok(())
            }
        }
    }

    /// Close the known non-actionable alert. Any other alert is logged and
    /// left alone; it may block later steps.
    pub async fn dismiss_known_alert(&self) -> Result<AlertDisposition> {
        let Some(alert) = Overlay::find(self.ctx.session(), OverlayKind::Alert).await? else {
            info!("No alert shown");
            return Ok(AlertDisposition::NotShown);
        };
        let content = alert.body().await?;
        if content.contains(KNOWN_ALERT_TEXT) {
            alert.click_button(KNOWN_ALERT_BUTTON).await?;
            info!("Dismissed expected alert");
            Ok(AlertDisposition::Dismissed)
        } else {
            warn!(
                "Unexpected alert visible, needs operator review: '{}'",
                content
            );
            Ok(AlertDisposition::Unexpected(content))
        }
    }

    pub async fn fill_fields(&self, chapter: &Chapter) -> Result<&Self> {
        fill_fields(self.ctx, chapter).await?;
        Ok(self)
    }

    pub async fn next_chapter(&self) -> Result<&Self> {
        info!("Advancing to the next chapter");
        self.ctx
            .find(&Self::next_chapter_link())
            .await?
            .click()
            .await?;
        Ok(self)
    }

    /// Fill every chapter in order, advancing between consecutive chapters.
    pub async fn fill_chapters(&self, chapters: &ChapterSet) -> Result<&Self> {
        for (index, chapter) in chapters.chapters().iter().enumerate() {
            if index > 0 {
                self.next_chapter().await?;
            }
            self.fill_fields(chapter).await?;
        }
        Ok(self)
    }

    pub async fn open_more_actions(&self) -> Result<&Self> {
        self.ctx
            .find(&Self::more_actions_link())
            .await?
            .click()
            .await?;
        Ok(self)
    }

    pub async fn click_submit(&self) -> Result<&Self> {
        self.ctx.find(&Self::submit_link()).await?.click().await?;
        Ok(self)
    }

    /// Answer "yes" to the "really submit?" modal, then wait briefly for it to
    /// be replaced so the verdict is not read off the confirmation itself.
    pub async fn confirm_submission(&self) -> Result<&Self> {
        let timeouts = self.ctx.timeouts();
        let dialog = Overlay::open(self.ctx, OverlayKind::Modal, timeouts.dialog_visible()).await?;
        let question = dialog.header().await?;
        let body = dialog.body().await?;
        dialog.click_button(CONFIRM_BUTTON).await?;
        info!("Confirmed dialog with the following text: {body}");

        let session = self.ctx.session();
        let question = question.as_str();
        let mut replaced = || async move {
            match Overlay::find(session, OverlayKind::Modal).await? {
                Some(overlay) => Ok(overlay.header().await? != question),
                None => Ok::<bool, Error>(true),
            }
        };
        self.ctx
            .waits()
            .poll(timeouts.dialog_visible(), &mut replaced)
            .await;
        Ok(self)
    }

    /// Read the portal's answer to a submission from the modal it shows,
    /// waiting out any progress modal in front of it.
    pub async fn submission_verdict(&self) -> Result<SubmissionVerdict> {
        let visible = self.ctx.timeouts().dialog_visible();
        loop {
            let dialog = Overlay::open(self.ctx, OverlayKind::Modal, visible).await?;
            let header = dialog.log_contents().await?;
            if is_progress_header(&header) {
                dialog
                    .wait_for_invisible(self.ctx.waits(), self.ctx.timeouts().progress_invisible())
                    .await?;
                continue;
            }
            return Ok(SubmissionVerdict::from_header(&header));
        }
    }

    /// Leave the form frame for the attachment screen that follows a
    /// successful submission.
    pub async fn leave(self) -> Result<AttachmentsPage<'a>> {
        self.ctx.session().switch_to_default().await?;
        Ok(AttachmentsPage::new(self.ctx))
    }
}

#[async_trait]
impl<'a> Screen for FormPage<'a> {
    fn name(&self) -> &'static str {
        "Űrlap"
    }

    fn readiness(&self) -> Locator {
        Self::next_chapter_link()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }

    /// The form lives in an iframe: switch into it first, then look for the
    /// chapter navigation.
    async fn wait_for_page(self, timeout: Duration) -> Result<Self> {
        self.ctx
            .wait_for_frame(&Self::frame(), self.ctx.timeouts().form_frame())
            .await?;
        self.ctx
            .wait_for_presence(&self.readiness(), timeout)
            .await?;
        info!(page = self.name(), "{} loaded", self.name());
        Ok(self)
    }
}
