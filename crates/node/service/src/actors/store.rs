//! Store calls bounded by the configured store timeout.

use crate::ObserverError;
use opera_storage::StorageError;
use std::{future::Future, time::Duration};

/// Awaits a store call, failing with [`StorageError::Timeout`] once `timeout` elapses.
pub(crate) async fn bounded<T>(
    op: &'static str,
    timeout: Duration,
    call: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, ObserverError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or_else(|_| Err(StorageError::Timeout(timeout)))
        .map_err(|source| ObserverError::Store { op, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_call_times_out() {
        let timeout = Duration::from_secs(5);
        let err = bounded("trx_count", timeout, std::future::pending::<Result<u64, _>>())
            .await
            .unwrap_err();

        match err {
            ObserverError::Store { op, source } => {
                assert_eq!(op, "trx_count");
                assert_eq!(source, StorageError::Timeout(timeout));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn test_store_errors_are_tagged() {
        let call = async { Err::<(), _>(StorageError::Backend("down".to_string())) };
        let err = bounded("add_block", Duration::from_secs(5), call).await.unwrap_err();

        assert!(matches!(err, ObserverError::Store { op: "add_block", .. }));
    }
}
