//! Core rate limiter implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::client::{InterceptionScope, SharedClient};
use crate::config::RateLimitConfig;
use crate::error::{Result, TollgateError};

use super::clock::{Clock, SystemClock};

/// Admission decision for one request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The attempt may proceed to the underlying transport
    Admit,
    /// The attempt is refused without contacting the transport
    Drop,
}

/// Mutable admission state, written only after an admitted call completes.
#[derive(Debug)]
struct LimiterState {
    /// Completion time of the last admitted request. `None` until the first
    /// admitted request completes, so the first attempt is always admitted.
    last_completed: Option<Instant>,
}

/// Client-side admission control for a shared HTTP client.
///
/// A limiter admits a request attempt when at least `1 / requests_per_second`
/// seconds have passed since the last admitted request *completed*; otherwise
/// the attempt is dropped. Cadence is measured completion-to-attempt, so a
/// slow upstream naturally throttles further admissions.
///
/// Cloning is cheap and clones share the same admission state. Limiters
/// constructed separately are fully independent.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    id: Uuid,
    min_delay: Duration,
    state: Arc<Mutex<LimiterState>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter for a target maximum request rate.
    ///
    /// Fails with `InvalidConfiguration` if `requests_per_second` is not a
    /// positive, finite number.
    pub fn new(requests_per_second: f64) -> Result<Self> {
        Self::with_clock(requests_per_second, Arc::new(SystemClock))
    }

    /// Create a rate limiter from a configuration section.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Self::new(config.requests_per_second)
    }

    pub(crate) fn with_clock(requests_per_second: f64, clock: Arc<dyn Clock>) -> Result<Self> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(TollgateError::InvalidConfiguration(format!(
                "requests_per_second must be positive and finite, got {requests_per_second}"
            )));
        }

        let min_delay =
            Duration::try_from_secs_f64(1.0 / requests_per_second).map_err(|_| {
                TollgateError::InvalidConfiguration(format!(
                    "requests_per_second {requests_per_second} yields an unrepresentable delay"
                ))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            min_delay,
            state: Arc::new(Mutex::new(LimiterState {
                last_completed: None,
            })),
            clock,
        })
    }

    /// Minimum interval enforced between admitted requests.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Run `workload` with this limiter gating the shared client.
    ///
    /// The gate is installed for exactly the duration of the workload and the
    /// client's previous request path is restored on every exit, including
    /// panics. Admission state carries over between activations of the same
    /// limiter.
    pub async fn wrap<F, Fut, T>(&self, client: &SharedClient, workload: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _scope = InterceptionScope::activate(client, self);
        workload().await
    }

    /// Decide whether a request attempt made now may proceed.
    ///
    /// Tie-break: an attempt exactly `min_delay` after the last completion is
    /// admitted.
    pub(crate) fn check(&self) -> Decision {
        let now = self.clock.now();
        let state = self.state.lock();

        trace!(limiter = %self.id, "Checking request admission");

        let Some(last_completed) = state.last_completed else {
            return Decision::Admit;
        };

        let elapsed = now.saturating_duration_since(last_completed);
        if elapsed >= self.min_delay {
            Decision::Admit
        } else {
            warn!(
                limiter = %self.id,
                offered_rate = offered_rate(elapsed),
                "Rate limit exceeded, dropping request"
            );
            Decision::Drop
        }
    }

    /// Record the completion time of an admitted request.
    ///
    /// Called after the underlying transport call returned a response, so the
    /// measured inter-request interval includes the latency of that call.
    pub(crate) fn record_completion(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.last_completed = Some(now);
    }
}

/// Instantaneous rate offered by an attempt, in requests per second.
///
/// Clamped to a finite value: back-to-back attempts can arrive with zero
/// elapsed time.
fn offered_rate(elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        f64::MAX
    } else {
        (1.0 / secs).min(f64::MAX)
    }
}
