use std::future::Future;

use log::{debug, error};
use tokio::time::Duration;

use crate::store::StoreError;

const MAX_RETRIES: u32 = 5;
const INITIAL_BACKOFF: u64 = 200;

/// Default bound on a single store round trip.
pub const TIMEOUT: Duration = Duration::from_secs(8);

/// Run a store call with a deadline, turning expiry into `StoreError::Timeout`.
pub async fn with_timeout<T, Fut>(limit: Duration, fut: Fut) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

/// Retry an idempotent store call with exponential backoff. Only transient
/// failures are retried; anything else is returned immediately.
pub async fn retry<F, Fut, T>(f: F) -> Result<T, StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF);

    for attempt in 0..MAX_RETRIES {
        match with_timeout(TIMEOUT, f()).await {
            Ok(result) => {
                return Ok(result);
            }
            Err(e) if !e.is_transient() || attempt == MAX_RETRIES - 1 => {
                error!("Attempt {} failed with error: {}", attempt + 1, e);
                return Err(e);
            }
            Err(e) => {
                error!("Attempt {} failed ({}), retrying after backoff", attempt + 1, e);
                debug!("Waiting for backoff: {:?}", backoff);

                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
            }
        }
    }

    Err(StoreError::Backend("All retry attempts failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_store_error() {
        let result: Result<(), _> = with_timeout(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::ContentionExhausted(1))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::UserNotFound("u".into()))
        })
        .await;
        assert!(matches!(result, Err(StoreError::UserNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
