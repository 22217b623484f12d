use std::future::Future;

use tracing::warn;

use crate::errors::ServiceError;

pub mod import;
pub mod ledger;
pub mod reports;
pub mod suggestions;

/// How many times a version-checked write is attempted before the conflict is
/// surfaced to the caller.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Only `ServiceError::Conflict` is retried; it is
/// what the version filter and the unique-violation mapping both produce.
pub(crate) async fn retry_on_conflict<T, F, Fut>(what: &str, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(ServiceError::Conflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                warn!(what, attempt, %reason, "write conflict, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_conflicts() {
        let calls = AtomicU32::new(0);
        let result = retry_on_conflict("test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(ServiceError::Conflict("version moved".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget_is_spent() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Conflict("still contended".into()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_WRITE_ATTEMPTS);
    }

    #[tokio::test]
    async fn non_conflict_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::NotFound("gone".into()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
