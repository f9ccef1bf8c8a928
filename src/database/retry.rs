use std::future::Future;
use tracing::{debug, warn};

use super::error::StoreResult;
use crate::error::{CourierError, Result};

/// Generate a candidate value and persist it, regenerating on unique-constraint
/// violations.
///
/// Only `StoreError::UniqueViolation` is retried. Any other failure is returned
/// at once as `CourierError::Storage`. After `max_attempts` collisions the
/// operation fails with `CodeGenerationExhausted`.
pub async fn with_unique_retry<V, T, G, P, Fut>(
    max_attempts: u32,
    mut generate: G,
    mut persist: P,
) -> Result<T>
where
    G: FnMut() -> V,
    P: FnMut(V) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    for attempt in 1..=max_attempts {
        let candidate = generate();
        match persist(candidate).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "unique value persisted after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_unique_violation() => {
                warn!(attempt, max_attempts, error = %err, "unique constraint collision, regenerating");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(CourierError::CodeGenerationExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn collision() -> StoreError {
        StoreError::UniqueViolation {
            constraint: "courier_shipments_tracking_code_key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let mut counter = 0;
        let result = with_unique_retry(
            5,
            || {
                counter += 1;
                counter
            },
            |candidate| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if candidate < 3 {
                        Err(collision())
                    } else {
                        Ok(candidate)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_fatal() {
        let result: Result<u32> =
            with_unique_retry(5, || 7u32, |_| async { Err(collision()) }).await;

        assert!(matches!(
            result,
            Err(CourierError::CodeGenerationExhausted { attempts: 5 })
        ));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = with_unique_retry(
            5,
            || 1u32,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Conflict("row changed".to_string())) }
            },
        )
        .await;

        assert!(matches!(result, Err(CourierError::Storage(StoreError::Conflict(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
