use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::operator::Operator;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of waiting with operator-confirmed retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition became true within a timeout window.
    Satisfied,
    /// A timeout window elapsed and the operator declined to keep polling.
    Abandoned,
}

/// Bounded polling with interactive retry-on-timeout.
#[derive(Clone)]
pub struct WaitPolicy {
    operator: Arc<dyn Operator>,
    poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(operator: Arc<dyn Operator>) -> Self {
        Self {
            operator,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn operator(&self) -> &Arc<dyn Operator> {
        &self.operator
    }

    /// Poll `condition` until it holds or `timeout` elapses, without asking
    /// anyone anything. The condition is checked once more at the deadline, so
    /// the answer does not depend on the polling interval.
    ///
    /// Errors from the condition count as "not yet".
    pub async fn poll<F, Fut>(&self, timeout: Duration, condition: &mut F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            match condition().await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!(error = %e, "condition not met yet"),
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Poll `condition`, asking the operator whether to start over each time
    /// `timeout` elapses. There is no limit on the number of retries.
    pub async fn await_condition<F, Fut>(
        &self,
        what: &str,
        timeout: Duration,
        mut condition: F,
    ) -> WaitOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        info!(timeout_secs = timeout.as_secs_f32(), "Waiting for {what}");
        loop {
            if self.poll(timeout, &mut condition).await {
                return WaitOutcome::Satisfied;
            }
            warn!(
                timeout_secs = timeout.as_secs_f32(),
                "Timed out waiting for {what}"
            );
            if !self.operator.confirm_retry(what, timeout).await {
                return WaitOutcome::Abandoned;
            }
            info!("Retrying wait for {what}");
        }
    }

    /// Like [`await_condition`](Self::await_condition), but an abandoned wait
    /// becomes [`Error::WaitAbandoned`]. Nothing below the process entry point
    /// handles that error, so the run ends there.
    pub async fn wait_until<F, Fut>(&self, what: &str, timeout: Duration, condition: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        match self.await_condition(what, timeout, condition).await {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::Abandoned => Err(Error::WaitAbandoned(what.to_string())),
        }
    }
}
