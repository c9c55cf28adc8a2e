//! Bounded waits.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// with_timeout
// ============================================================================

/// Awaits `future` for at most `limit`.
///
/// Expiry abandons the wait and drops the future. Work already handed to the
/// browser keeps running; only the caller stops waiting.
///
/// # Errors
///
/// Returns [`Error::Timeout`] naming `operation` on expiry, or the future's
/// own error.
pub async fn with_timeout<F, T>(operation: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = limit.as_millis() as u64;
            debug!(operation, timeout_ms, "Operation timed out");
            Err(Error::timeout(operation, timeout_ms))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let err = with_timeout("subscribe", Duration::from_millis(15_000), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Timeout { ref operation, timeout_ms: 15_000 } if operation == "subscribe"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_limit() {
        let value = with_timeout("subscribe", Duration::from_secs(15), async {
            tokio::time::sleep(Duration::from_secs(14)).await;
            Ok(7)
        })
        .await
        .expect("in time");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = with_timeout::<_, ()>("subscribe", Duration::from_secs(1), async {
            Err(Error::subscription("Registration failed - no sender id provided"))
        })
        .await
        .unwrap_err();
        assert!(!err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_until_deadline() {
        let mut wait = tokio_test::task::spawn(with_timeout(
            "subscribe",
            Duration::from_secs(15),
            std::future::pending::<Result<()>>(),
        ));
        tokio_test::assert_pending!(wait.poll());

        tokio::time::advance(Duration::from_secs(14)).await;
        tokio_test::assert_pending!(wait.poll());

        tokio::time::advance(Duration::from_secs(1)).await;
        let result = tokio_test::assert_ready!(wait.poll());
        assert!(result.unwrap_err().is_timeout());
    }
}
