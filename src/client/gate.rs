//! Gated request path and its activation scope.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::ratelimit::{Decision, RateLimiter};

use super::executor::{Outcome, Request, RequestExecutor};
use super::SharedClient;

/// Request executor that consults a rate limiter before delegating.
///
/// On admission the wrapped executor is invoked with the request unchanged
/// and its result is returned unchanged; the limiter records the completion
/// time afterwards. On refusal the wrapped executor is never invoked and the
/// attempt resolves to [`Outcome::Dropped`].
pub struct GatedExecutor {
    inner: Arc<dyn RequestExecutor>,
    limiter: RateLimiter,
}

impl GatedExecutor {
    /// Wrap `inner` with admission control from `limiter`.
    pub fn new(inner: Arc<dyn RequestExecutor>, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl RequestExecutor for GatedExecutor {
    async fn execute(&self, request: Request) -> Result<Outcome> {
        match self.limiter.check() {
            Decision::Drop => Ok(Outcome::Dropped),
            Decision::Admit => {
                let outcome = self.inner.execute(request).await?;
                // A Dropped outcome from a nested gate means no call was
                // made; only a real response marks a completion.
                if let Outcome::Response(_) = outcome {
                    self.limiter.record_completion();
                }
                Ok(outcome)
            }
        }
    }
}

/// Bounded activation of a rate limiter on a shared client.
///
/// Activation installs a gated executor wrapping whatever executor was
/// ambient at that moment; dropping the scope reinstates exactly that saved
/// executor. Restoration runs on every exit path, unwinding included, so a
/// failed workload never leaves the client gated. Activations nest LIFO:
/// each scope restores the executor that was ambient immediately before it.
pub struct InterceptionScope<'c> {
    client: &'c SharedClient,
    saved: Option<Arc<dyn RequestExecutor>>,
}

impl<'c> InterceptionScope<'c> {
    /// Install `limiter`'s gate on `client`.
    pub fn activate(client: &'c SharedClient, limiter: &RateLimiter) -> Self {
        let limiter = limiter.clone();
        let saved = client.swap(move |previous| Arc::new(GatedExecutor::new(previous, limiter)));
        debug!("Request gate installed");
        Self {
            client,
            saved: Some(saved),
        }
    }
}

impl Drop for InterceptionScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.client.restore(saved);
            debug!("Request gate removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use tokio_test::assert_ok;

    use crate::client::testing::{FailingExecutor, RecordingExecutor};
    use crate::error::TollgateError;
    use crate::ratelimit::ManualClock;

    use super::*;

    const URL: &str = "http://upstream.test/resource";

    fn manual_limiter(requests_per_second: f64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(Instant::now());
        let limiter = RateLimiter::with_clock(requests_per_second, Arc::new(clock.clone()))
            .expect("valid rate");
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_rate_violating_request_is_discarded() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (limiter, _clock) = manual_limiter(1.0);

        let (first, second) = limiter
            .wrap(&client, || async {
                let first = client.get(URL).await.unwrap();
                let second = client.get(URL).await.unwrap();
                (first, second)
            })
            .await;

        assert!(first.response().is_some());
        assert!(second.is_dropped());
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_complying_requests_are_executed() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (limiter, clock) = manual_limiter(20.0);

        limiter
            .wrap(&client, || async {
                for _ in 0..10 {
                    clock.advance(limiter.min_delay());
                    let outcome = assert_ok!(client.get(URL).await);
                    assert!(outcome.response().is_some());
                }
            })
            .await;

        assert_eq!(executor.calls(), 10);
    }

    #[tokio::test]
    async fn test_separate_limiters_do_not_interfere() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (limiter_10, _clock_10) = manual_limiter(10.0);
        let (limiter_20, _clock_20) = manual_limiter(20.0);

        let res_10 = limiter_10
            .wrap(&client, || client.get(URL))
            .await
            .unwrap();
        let res_20 = limiter_20
            .wrap(&client, || client.get(URL))
            .await
            .unwrap();

        assert!(res_10.response().is_some());
        assert!(res_20.response().is_some());
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_admission_state_persists_across_activations() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (limiter, clock) = manual_limiter(20.0);

        let first = limiter.wrap(&client, || client.get(URL)).await.unwrap();
        assert!(first.response().is_some());

        // Rate memory survives the gate being reinstalled.
        let second = limiter.wrap(&client, || client.get(URL)).await.unwrap();
        assert!(second.is_dropped());

        clock.advance(limiter.min_delay());
        let third = limiter.wrap(&client, || client.get(URL)).await.unwrap();
        assert!(third.response().is_some());
    }

    #[tokio::test]
    async fn test_gate_restored_after_normal_exit() {
        let original: Arc<dyn RequestExecutor> = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(original.clone());
        let (limiter, _clock) = manual_limiter(1.0);

        limiter.wrap(&client, || async {}).await;

        assert!(Arc::ptr_eq(&client.current_executor(), &original));
    }

    #[tokio::test]
    async fn test_gate_restored_after_failed_workload() {
        let original: Arc<dyn RequestExecutor> = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(original.clone());
        let (limiter, _clock) = manual_limiter(1.0);

        let result: std::result::Result<(), &str> = limiter
            .wrap(&client, || async { Err("workload failed") })
            .await;

        assert!(result.is_err());
        assert!(Arc::ptr_eq(&client.current_executor(), &original));
    }

    #[tokio::test]
    async fn test_gate_restored_after_panicking_workload() {
        let original: Arc<dyn RequestExecutor> = Arc::new(RecordingExecutor::default());
        let client = Arc::new(SharedClient::new(original.clone()));
        let (limiter, _clock) = manual_limiter(1.0);

        let task_client = Arc::clone(&client);
        let handle = tokio::spawn(async move {
            limiter
                .wrap(&task_client, || async {
                    panic!("workload failed");
                })
                .await
        });
        assert!(handle.await.is_err());

        assert!(Arc::ptr_eq(&client.current_executor(), &original));
    }

    #[test]
    fn test_nested_activations_restore_lifo() {
        let original: Arc<dyn RequestExecutor> = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(original.clone());
        let (limiter_a, _clock_a) = manual_limiter(10.0);
        let (limiter_b, _clock_b) = manual_limiter(20.0);

        let scope_a = InterceptionScope::activate(&client, &limiter_a);
        let gate_a = client.current_executor();
        assert!(!Arc::ptr_eq(&gate_a, &original));

        let scope_b = InterceptionScope::activate(&client, &limiter_b);
        assert!(!Arc::ptr_eq(&client.current_executor(), &gate_a));

        drop(scope_b);
        assert!(Arc::ptr_eq(&client.current_executor(), &gate_a));

        drop(scope_a);
        assert!(Arc::ptr_eq(&client.current_executor(), &original));
    }

    #[tokio::test]
    async fn test_transport_error_propagates_and_does_not_mark_completion() {
        let client = SharedClient::new(Arc::new(FailingExecutor));
        let (limiter, _clock) = manual_limiter(1.0);

        limiter
            .wrap(&client, || async {
                let first = client.get(URL).await;
                assert!(matches!(first, Err(TollgateError::Transport(_))));

                // The failed call never completed, so the next attempt is
                // admitted again rather than dropped.
                let second = client.get(URL).await;
                assert!(matches!(second, Err(TollgateError::Transport(_))));
            })
            .await;
    }

    #[tokio::test]
    async fn test_admitted_request_and_response_pass_through_unchanged() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (limiter, _clock) = manual_limiter(1.0);

        let outcome = limiter.wrap(&client, || client.get(URL)).await.unwrap();

        let response = outcome.into_response().unwrap();
        assert_eq!(response.body().as_slice(), b"ok");
        assert_eq!(executor.last_uri().as_deref(), Some(URL));
    }

    #[tokio::test]
    async fn test_inner_drop_does_not_mark_outer_completion() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (exhausted, _clock_a) = manual_limiter(1.0);
        let (fresh, _clock_b) = manual_limiter(1.0);
        exhausted.record_completion();

        let scope_inner = InterceptionScope::activate(&client, &exhausted);
        let scope_outer = InterceptionScope::activate(&client, &fresh);

        let outcome = client.get(URL).await.unwrap();
        assert!(outcome.is_dropped());
        assert_eq!(executor.calls(), 0);

        // The fresh limiter admitted but saw no response, so it retains no
        // completion and still admits.
        assert_eq!(fresh.check(), Decision::Admit);

        drop(scope_outer);
        drop(scope_inner);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_limiter() {
        let executor = Arc::new(RecordingExecutor::default());
        let client = SharedClient::new(executor.clone());
        let (limiter, _clock) = manual_limiter(1.0);

        limiter
            .wrap(&client, || async {
                let attempts = (0..8).map(|_| client.get(URL));
                let outcomes = futures::future::join_all(attempts).await;
                let responses = outcomes
                    .iter()
                    .filter(|result| matches!(result, Ok(outcome) if !outcome.is_dropped()))
                    .count();
                assert!(responses >= 1);
            })
            .await;

        // Once a completion is on record, an immediate attempt is dropped.
        let outcome = limiter.wrap(&client, || client.get(URL)).await.unwrap();
        assert!(outcome.is_dropped());
    }
}
