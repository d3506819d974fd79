//! Transient overlays drawn over the portal's pages.
//!
//! The portal uses two unrelated dialog widgets: a Bootstrap-style modal
//! (`role=alertdialog`) for progress, confirmation and validation reports, and
//! a jQuery UI dialog (`role=dialog`) for one informational notice. Both are
//! handled through [`Overlay`]; [`OverlayKind`] carries the markup differences.
//! They never show at the same time.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::page::PageContext;
use crate::session::{xpath_literal, ElementId, Locator, Session};
use crate::wait::WaitPolicy;

/// Header fragment of the "processing in progress" modal, lower case.
pub const PROGRESS_TOKEN: &str = "feldolgozás folyamatban";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// `role=alertdialog`, with `.modal-header` and `.modal-body`.
    Modal,
    /// `role=dialog`, with `.ui-dialog-title` and `.ui-dialog-content`.
    Alert,
}

impl OverlayKind {
    pub fn label(&self) -> &'static str {
        match self {
            OverlayKind::Modal => "modal",
            OverlayKind::Alert => "alert",
        }
    }

    pub fn root(&self) -> Locator {
        match self {
            OverlayKind::Modal => Locator::xpath("//*[@role='alertdialog']"),
            OverlayKind::Alert => Locator::xpath("//*[@role='dialog']"),
        }
    }

    fn heading(&self) -> Locator {
        match self {
            OverlayKind::Modal => Locator::class_name("modal-header"),
            OverlayKind::Alert => Locator::class_name("ui-dialog-title"),
        }
    }

    fn content(&self) -> Locator {
        match self {
            OverlayKind::Modal => Locator::class_name("modal-body"),
            OverlayKind::Alert => Locator::class_name("ui-dialog-content"),
        }
    }

    /// Alert buttons wrap their label in a `<span>`, so match on the whole
    /// subtree there.
    fn button(&self, label: &str) -> Locator {
        match self {
            OverlayKind::Modal => Locator::xpath(format!(
                ".//button[contains(text(), {})]",
                xpath_literal(label)
            )),
            OverlayKind::Alert => Locator::nested_button_text(label),
        }
    }
}

/// Does this header belong to the "processing in progress" modal?
pub fn is_progress_header(header: &str) -> bool {
    header.to_lowercase().contains(PROGRESS_TOKEN)
}

/// An overlay currently in the DOM.
pub struct Overlay<'s> {
    session: &'s dyn Session,
    kind: OverlayKind,
    element: ElementId,
}

impl<'s> Overlay<'s> {
    /// The overlay of `kind` if one is displayed right now. Closed overlays
    /// often stay attached to the document; those are skipped.
    pub async fn find(session: &'s dyn Session, kind: OverlayKind) -> Result<Option<Overlay<'s>>> {
        Ok(first_displayed(session, kind)
            .await?
            .map(|element| Overlay {
                session,
                kind,
                element,
            }))
    }

    pub async fn is_present(session: &dyn Session, kind: OverlayKind) -> Result<bool> {
        Ok(first_displayed(session, kind).await?.is_some())
    }

    /// Attach to the displayed overlay of `kind`.
    ///
    /// With a zero `visible_timeout` the overlay must already be displayed. With
    /// a positive one, wait for it under the usual operator-confirmed retry.
    pub async fn open(
        ctx: &'s PageContext,
        kind: OverlayKind,
        visible_timeout: Duration,
    ) -> Result<Overlay<'s>> {
        if visible_timeout.is_zero() {
            return Self::find(ctx.session(), kind)
                .await?
                .ok_or(Error::OverlayNotPresent(kind.label()));
        }
        let session = ctx.session();
        let seen = Mutex::new(None);
        let seen_ref = &seen;
        let what = format!("{} overlay to be visible", kind.label());
        ctx.waits()
            .wait_until(&what, visible_timeout, || async move {
                let element = first_displayed(session, kind).await?;
                *seen_ref.lock() = element;
                Ok::<bool, Error>(element.is_some())
            })
            .await?;
        let element = seen
            .lock()
            .take()
            .ok_or(Error::OverlayNotPresent(kind.label()))?;
        Ok(Overlay {
            session,
            kind,
            element,
        })
    }

    /// Poll for up to `timeout` for an overlay of `kind` to be displayed,
    /// without involving the operator if none is.
    pub async fn appear_within(
        ctx: &'s PageContext,
        kind: OverlayKind,
        timeout: Duration,
    ) -> Result<Option<Overlay<'s>>> {
        let session = ctx.session();
        let seen = Mutex::new(None);
        let seen_ref = &seen;
        let mut displayed = || async move {
            let element = first_displayed(session, kind).await?;
            *seen_ref.lock() = element;
            Ok::<bool, Error>(element.is_some())
        };
        if !ctx.waits().poll(timeout, &mut displayed).await {
            return Ok(None);
        }
        let element = seen.lock().take();
        Ok(element.map(|element| Overlay {
            session,
            kind,
            element,
        }))
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    /// Modal header, or alert title.
    pub async fn header(&self) -> Result<String> {
        let heading = self
            .session
            .find_child(self.element, &self.kind.heading())
            .await?;
        self.session.text(heading).await
    }

    /// Modal body, or alert content.
    pub async fn body(&self) -> Result<String> {
        let content = self
            .session
            .find_child(self.element, &self.kind.content())
            .await?;
        self.session.text(content).await
    }

    /// Click the button whose label contains `label`.
    pub async fn click_button(&self, label: &str) -> Result<()> {
        let button = self
            .session
            .find_child(self.element, &self.kind.button(label))
            .await?;
        info!(overlay = self.kind.label(), "Clicking overlay button '{label}'");
        self.session.click(button).await
    }

    /// Wait until the overlay is hidden or detached from the document.
    pub async fn wait_for_invisible(&self, waits: &WaitPolicy, timeout: Duration) -> Result<()> {
        let what = format!("{} overlay to disappear", self.kind.label());
        let session = self.session;
        let element = self.element;
        waits
            .wait_until(&what, timeout, || async move {
                let shown = matches!(session.is_displayed(element).await, Ok(true));
                Ok::<bool, Error>(!shown)
            })
            .await
    }

    /// Log what the overlay says and return its header.
    pub async fn log_contents(&self) -> Result<String> {
        let header = self.header().await?;
        let body = self.body().await?;
        info!(
            overlay = self.kind.label(),
            "Dialog visible:\nheader: '{header}'\nbody:\n{body}"
        );
        Ok(header)
    }
}

/// The first attached overlay of `kind` that is actually displayed.
async fn first_displayed(session: &dyn Session, kind: OverlayKind) -> Result<Option<ElementId>> {
    for element in session.find_elements(&kind.root()).await? {
        // A node detached since the lookup is as good as hidden.
        if matches!(session.is_displayed(element).await, Ok(true)) {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// Log the overlay and, if it is the progress modal, wait for it to go away.
pub async fn wait_out_progress(ctx: &PageContext, overlay: &Overlay<'_>) -> Result<()> {
    let header = overlay.log_contents().await?;
    if is_progress_header(&header) {
        overlay
            .wait_for_invisible(ctx.waits(), ctx.timeouts().progress_invisible())
            .await?;
        info!("Progress overlay gone");
    }
    Ok(())
}
