//! Bounded polling.
//!
//! Some flows (browser location consent, OAuth relay codes) only complete
//! after the user acts elsewhere. [`poll_until`] checks a condition at a fixed
//! interval and gives up after a fixed number of attempts.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::domains::tools::ToolError;

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on wall-clock time spent waiting between attempts.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(2))
    }
}

/// Outcome of a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus<T> {
    /// The awaited value is available.
    Ready(T),
    /// Not yet; try again after the interval.
    Pending,
    /// The upstream reported a definitive failure; stop polling.
    Abort(String),
}

/// Check until ready, aborted, or out of attempts.
///
/// `check` receives the 1-based attempt number. The loop sleeps between
/// attempts but not after the last one. Exhaustion yields a timeout error
/// naming `what`.
pub async fn poll_until<T, F, Fut>(
    policy: PollPolicy,
    what: &str,
    mut check: F,
) -> Result<T, ToolError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStatus<T>>,
{
    for attempt in 1..=policy.max_attempts {
        match check(attempt).await {
            PollStatus::Ready(value) => {
                info!(attempt, "{} ready", what);
                return Ok(value);
            }
            PollStatus::Abort(reason) => {
                return Err(ToolError::upstream(format!("{}: {}", what, reason)));
            }
            PollStatus::Pending => {
                debug!(attempt, max_attempts = policy.max_attempts, "{} pending", what);
            }
        }

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    Err(ToolError::timeout(format!(
        "{} not available after {} attempts",
        what, policy.max_attempts
    )))
}
