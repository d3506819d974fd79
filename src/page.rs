//! Typed portal screens.
//!
//! A [`Screen`] binds the shared [`PageContext`] to one portal screen and knows
//! the landmark element whose presence means the screen has rendered. A screen
//! value is meaningful only after [`Screen::wait_for_page`] has returned it, and
//! goes stale as soon as the session moves on; nothing enforces that beyond the
//! orchestrator driving one screen at a time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::Timeouts;
use crate::element::Element;
use crate::error::Result;
use crate::session::{Locator, Session};
use crate::wait::WaitPolicy;

/// What every screen and overlay needs: the session, the wait policy and the
/// configured wait bounds.
pub struct PageContext {
    session: Arc<dyn Session>,
    waits: WaitPolicy,
    timeouts: Timeouts,
}

impl PageContext {
    pub fn new(session: Arc<dyn Session>, waits: WaitPolicy, timeouts: Timeouts) -> Self {
        Self {
            session,
            waits,
            timeouts,
        }
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    pub fn waits(&self) -> &WaitPolicy {
        &self.waits
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// The first element matching `locator`, failing immediately if absent.
    pub async fn find(&self, locator: &Locator) -> Result<Element<'_>> {
        let id = self.session.find_element(locator).await?;
        Ok(Element::new(self.session(), id))
    }

    /// Every element matching `locator`, in document order.
    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<Element<'_>>> {
        let ids = self.session.find_elements(locator).await?;
        Ok(ids
            .into_iter()
            .map(|id| Element::new(self.session(), id))
            .collect())
    }

    /// Whether anything currently matches `locator`.
    pub async fn is_present(&self, locator: &Locator) -> Result<bool> {
        Ok(!self.session.find_elements(locator).await?.is_empty())
    }

    /// Wait, with operator-confirmed retries, until `locator` matches something.
    pub async fn wait_for_presence(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let what = format!("presence of {locator}");
        let session = self.session();
        self.waits
            .wait_until(&what, timeout, || async move {
                session
                    .find_elements(locator)
                    .await
                    .map(|found| !found.is_empty())
            })
            .await
    }

    /// Wait, with operator-confirmed retries, until `frame` is available, then
    /// switch the session into it.
    pub async fn wait_for_frame(&self, frame: &Locator, timeout: Duration) -> Result<()> {
        let what = format!("frame {frame} to be available");
        let session = self.session();
        self.waits
            .wait_until(&what, timeout, || async move { session.switch_to_frame(frame).await })
            .await
    }

    /// Fixed pause. Only for controls that are present but ignore input for a
    /// while, where no DOM state tells the two apart.
    pub async fn settle(&self, duration: Duration) {
        info!(secs = duration.as_secs_f32(), "Pausing before interacting");
        tokio::time::sleep(duration).await;
    }
}

/// One portal screen.
#[async_trait]
pub trait Screen: Sized + Send {
    /// Display label used in logs.
    fn name(&self) -> &'static str;

    /// Landmark element unique to this screen.
    fn readiness(&self) -> Locator;

    fn context(&self) -> &PageContext;

    /// Block until the landmark is present, then hand the screen back.
    async fn wait_for_page(self, timeout: Duration) -> Result<Self> {
        let landmark = self.readiness();
        self.context().wait_for_presence(&landmark, timeout).await?;
        info!(page = self.name(), "{} loaded", self.name());
        Ok(self)
    }
}
