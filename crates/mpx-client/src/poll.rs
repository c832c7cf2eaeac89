//! Status polling shared by PDFs, conversions and file batches.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::TRACING_TARGET_CLIENT;
use crate::error::{Error, Result};

/// Outcome of a single status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollState {
    Pending,
    Completed,
    Failed,
}

/// Call `check` every `interval` until it settles or `timeout` elapses.
///
/// Returns `Ok(true)` once completed and `Ok(false)` on failure or timeout.
/// `check` always runs at least once.
pub(crate) async fn wait_until<F, Fut>(
    resource: &str,
    id: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState>>,
{
    if timeout.is_zero() {
        return Err(Error::validation(
            "Timeout must be a positive, non-zero duration",
        ));
    }

    tracing::info!(
        target: TRACING_TARGET_CLIENT,
        resource,
        id,
        timeout_secs = timeout.as_secs_f64(),
        "Waiting for completion"
    );

    // Timeouts too large to represent never expire.
    let deadline = Instant::now().checked_add(timeout);
    let mut attempt: u32 = 1;

    loop {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            resource,
            id,
            attempt,
            "Checking status"
        );

        match check().await? {
            PollState::Completed => {
                tracing::info!(
                    target: TRACING_TARGET_CLIENT,
                    resource,
                    id,
                    "Completed successfully"
                );
                return Ok(true);
            }
            PollState::Failed => {
                tracing::warn!(
                    target: TRACING_TARGET_CLIENT,
                    resource,
                    id,
                    "Processing reported an error"
                );
                return Ok(false);
            }
            PollState::Pending => {}
        }

        let delay = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    tracing::warn!(
                        target: TRACING_TARGET_CLIENT,
                        resource,
                        id,
                        timeout_secs = timeout.as_secs_f64(),
                        "Did not complete within timeout period"
                    );
                    return Ok(false);
                }
                interval.min(deadline - now)
            }
            None => interval,
        };

        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_zero_timeout_rejected() {
        let result = wait_until("pdf", "abc", Duration::ZERO, Duration::from_millis(1), || async {
            Ok(PollState::Completed)
        })
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_unbounded_timeout() {
        let checks = Arc::new(AtomicU32::new(0));
        let counter = checks.clone();

        let completed = wait_until("pdf", "abc", Duration::MAX, Duration::from_millis(1), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(PollState::Pending)
                } else {
                    Ok(PollState::Completed)
                }
            }
        })
        .await
        .unwrap();

        assert!(completed);
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_completes_after_pending_checks() {
        let checks = Arc::new(AtomicU32::new(0));
        let counter = checks.clone();

        let completed = wait_until(
            "conversion",
            "abc",
            Duration::from_secs(5),
            Duration::from_millis(1),
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                        Ok(PollState::Pending)
                    } else {
                        Ok(PollState::Completed)
                    }
                }
            },
        )
        .await
        .unwrap();

        assert!(completed);
        assert_eq!(checks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failure_stops_polling() {
        let completed = wait_until(
            "pdf",
            "abc",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || async { Ok(PollState::Failed) },
        )
        .await
        .unwrap();
        assert!(!completed);
    }

    #[tokio::test]
    async fn test_times_out() {
        let completed = wait_until(
            "file_batch",
            "abc",
            Duration::from_millis(30),
            Duration::from_millis(5),
            || async { Ok(PollState::Pending) },
        )
        .await
        .unwrap();
        assert!(!completed);
    }

    #[tokio::test]
    async fn test_check_errors_propagate() {
        let result = wait_until(
            "pdf",
            "abc",
            Duration::from_secs(1),
            Duration::from_millis(1),
            || async { Err(Error::api(500, "boom")) },
        )
        .await;
        assert!(matches!(result, Err(Error::Api { status: 500, .. })));
    }
}
