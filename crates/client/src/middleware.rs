//! Standalone timeout / retry decorators.
//!
//! Smaller-scope utilities used ad hoc at a few call sites. Deliberately not
//! composed with the dispatcher and deliberately on a different backoff
//! curve (linear, narrower retry class) — keep them separate primitives.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use common::ServiceError;

const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Race `operation` against the clock.
///
/// The operation is spawned on its own task: a timeout abandons interest in
/// the result but does not cancel the in-flight work.
pub async fn with_timeout<T, Fut>(operation: Fut, limit: Duration) -> Result<T, ServiceError>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
{
    let handle = tokio::spawn(operation);
    match timeout(limit, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ServiceError::Unexpected(format!("operation task failed: {}", join_err))),
        Err(_) => {
            warn!(limit_ms = limit.as_millis() as u64, "operation timed out");
            Err(ServiceError::Timeout(format!(
                "operation did not complete within {}ms",
                limit.as_millis()
            )))
        }
    }
}

/// Retry with linear backoff: `base * attempt_number` (500ms, then 1s).
///
/// Only network and server (status >= 500) failures are retried; the
/// dispatcher's broader transient class does not apply here.
pub async fn with_retry<T, F, Fut>(mut operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let transient = matches!(
                    err,
                    ServiceError::Network(_) | ServiceError::Unavailable { .. }
                );
                if !transient || attempt >= RETRY_MAX_ATTEMPTS {
                    return Err(err);
                }
                let delay = RETRY_BASE_DELAY * attempt;
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_when_the_operation_is_slow() {
        let finished = Arc::new(AtomicBool::new(false));
        let finished_in = finished.clone();
        let t0 = tokio::time::Instant::now();
        let result = with_timeout(
            async move {
                sleep(Duration::from_millis(500)).await;
                finished_in.store(true, Ordering::SeqCst);
                Ok(1u32)
            },
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Timeout(_))));
        assert_eq!(t0.elapsed(), Duration::from_millis(100));

        // the spawned work keeps running to completion in the background
        sleep(Duration::from_millis(500)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fast_operation_beats_the_timeout() {
        let result = with_timeout(async { Ok::<_, ServiceError>("done") }, Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn linear_retry_spaces_attempts_by_growing_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let t0 = tokio::time::Instant::now();
        let result: Result<u32, _> = with_retry(move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Unavailable { status: 500, message: "boom".into() })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 500ms after attempt 1, 1000ms after attempt 2
        assert_eq!(t0.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn rate_limit_failures_are_not_retried_here() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let result: Result<u32, _> = with_retry(move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::RateLimited)
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_then_success_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();
        let result = with_retry(move || {
            let calls = calls_in.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ServiceError::Network("reset".into()))
                } else {
                    Ok(11u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 11);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
