use tracing::info;

use crate::error::Result;
use crate::page::{PageContext, Screen};
use crate::session::Locator;

/// Attachment upload screen that follows an accepted form. Slow to load.
pub struct AttachmentsPage<'a> {
    ctx: &'a PageContext,
}

impl<'a> AttachmentsPage<'a> {
    pub fn new(ctx: &'a PageContext) -> Self {
        Self { ctx }
    }

    fn submit_button() -> Locator {
        Locator::button_text("Beküldés")
    }

    /// Send the case, with whatever attachments the operator added.
    pub async fn submit(self) -> Result<()> {
        self.ctx.find(&Self::submit_button()).await?.click().await?;
        info!("Case submitted");
        Ok(())
    }
}

impl Screen for AttachmentsPage<'_> {
    fn name(&self) -> &'static str {
        "Csatolmányok hozzáadása"
    }

    fn readiness(&self) -> Locator {
        Self::submit_button()
    }

    fn context(&self) -> &PageContext {
        self.ctx
    }
}
