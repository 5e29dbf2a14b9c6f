//! Background work forked off the observer: series recompute and transaction persistence.

use crate::{ObserverError, actors::store};
use futures::future::join_all;
use opera_protocol::{Block, CountTick};
use opera_providers_alloy::UpstreamClient;
use opera_storage::{
    AggregationStorage, ExplorerStore, MetadataStore, TransactionRecord, TransactionStorage,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::OwnedMutexGuard;

/// Recomputes the transaction count and gas series ending at `bucket` and publishes them.
///
/// The guard holds the last published bucket; it only moves forward on success so a failed
/// recompute is retried by the next block.
pub(super) async fn aggregate(
    store: Arc<dyn AggregationStorage>,
    metadata: Arc<MetadataStore>,
    mut last_bucket: OwnedMutexGuard<u64>,
    bucket: u64,
    resolution: u64,
    ticks: usize,
    timeout: Duration,
) {
    match series(store.as_ref(), bucket, resolution, ticks, timeout).await {
        Ok((txs, gas)) => {
            let published = metadata.set_ticks(bucket, txs, gas);
            *last_bucket = bucket;
            debug!(target: "observer", bucket, published, "Recomputed aggregation series");

            #[cfg(feature = "metrics")]
            metrics::counter!(crate::Metrics::AGGREGATION_RECOMPUTES).increment(1);
        }
        Err(err) => {
            warn!(target: "observer", bucket, %err, "Failed to recompute aggregation series");
        }
    }
}

async fn series(
    store: &dyn AggregationStorage,
    end: u64,
    resolution: u64,
    ticks: usize,
    timeout: Duration,
) -> Result<(Vec<CountTick>, Vec<CountTick>), ObserverError> {
    let txs =
        store::bounded("txs_aggregation", timeout, store.txs_aggregation(end, resolution, ticks))
            .await?;
    let gas =
        store::bounded("gas_aggregation", timeout, store.gas_aggregation(end, resolution, ticks))
            .await?;
    Ok((txs, gas))
}

/// Fetches every transaction of `block` and writes one row per transaction, indexed by the
/// addresses it touches. Rows whose transaction cannot be fetched are dropped.
///
/// With `shrink_to` set, the stored transactions are trimmed to that many afterwards.
pub(super) async fn persist(
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn ExplorerStore>,
    block: Arc<Block>,
    timeout: Duration,
    shrink_to: Option<usize>,
) {
    let fetched = join_all(block.transactions.iter().map(|hash| upstream.transaction(*hash))).await;

    let mut rows = Vec::with_capacity(fetched.len());
    for (hash, fetched) in block.transactions.iter().zip(fetched) {
        match fetched {
            Ok(tx) => rows.push(TransactionRecord::new(
                tx.hash,
                block.number,
                block.timestamp,
                tx.addresses(),
            )),
            Err(err) => {
                warn!(target: "observer", %hash, number = block.number, %err, "Failed to fetch transaction, dropping row");
            }
        }
    }

    if !rows.is_empty() {
        let count = rows.len();
        match store::bounded("add_transactions", timeout, store.add_transactions(rows)).await {
            Ok(()) => trace!(target: "observer", number = block.number, count, "Persisted transactions"),
            Err(err) => error!(target: "observer", number = block.number, %err, "Failed to persist transactions"),
        }
    }

    if let Some(max_count) = shrink_to {
        match store::bounded("shrink_transactions", timeout, store.shrink_transactions(max_count))
            .await
        {
            Ok(removed) => debug!(target: "observer", removed, max_count, "Shrunk stored transactions"),
            Err(err) => error!(target: "observer", %err, "Failed to shrink stored transactions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use opera_storage::{MockAggregationStorage, StorageError};
    use tokio::sync::Mutex;

    const T0: u64 = 1_689_601_270;
    const RESOLUTION: u64 = 10;
    const TICKS: usize = 3;
    const TIMEOUT: Duration = Duration::from_secs(5);

    fn series_at(end: u64, value: u64) -> Vec<CountTick> {
        opera_protocol::series_timestamps(end, RESOLUTION, TICKS)
            .map(|timestamp| CountTick::new(timestamp, value))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_recompute_is_retried_and_keeps_the_last_series() {
        let mut store = MockAggregationStorage::new();
        let mut seq = Sequence::new();
        store
            .expect_txs_aggregation()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(StorageError::Backend("unavailable".to_string())));
        store
            .expect_txs_aggregation()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|end, _, _| Ok(series_at(end, 2)));
        store.expect_gas_aggregation().returning(|end, _, _| Ok(series_at(end, 42_000)));
        let store: Arc<dyn AggregationStorage> = Arc::new(store);

        let metadata = Arc::new(MetadataStore::new());
        metadata.set_ticks(T0 - RESOLUTION, series_at(T0 - RESOLUTION, 1), vec![]);
        let last_bucket = Arc::new(Mutex::new(T0 - RESOLUTION));

        let guard = Arc::clone(&last_bucket).try_lock_owned().unwrap();
        aggregate(store.clone(), metadata.clone(), guard, T0, RESOLUTION, TICKS, TIMEOUT).await;

        // The bucket did not move and readers still see the previous series.
        assert_eq!(*last_bucket.lock().await, T0 - RESOLUTION);
        assert_eq!(metadata.snapshot().aggregated_at, Some(T0 - RESOLUTION));
        assert_eq!(metadata.txs_ticks(), series_at(T0 - RESOLUTION, 1));

        let guard = Arc::clone(&last_bucket).try_lock_owned().unwrap();
        aggregate(store, metadata.clone(), guard, T0, RESOLUTION, TICKS, TIMEOUT).await;

        assert_eq!(*last_bucket.lock().await, T0);
        assert_eq!(metadata.snapshot().aggregated_at, Some(T0));
        assert_eq!(metadata.txs_ticks(), series_at(T0, 2));
        assert_eq!(metadata.gas_ticks(), series_at(T0, 42_000));
    }

    #[tokio::test]
    async fn test_guard_is_released_after_a_failure() {
        let mut store = MockAggregationStorage::new();
        store
            .expect_txs_aggregation()
            .returning(|_, _, _| Err(StorageError::Backend("unavailable".to_string())));
        store.expect_gas_aggregation().never();

        let last_bucket = Arc::new(Mutex::new(0));
        let guard = Arc::clone(&last_bucket).try_lock_owned().unwrap();
        let metadata = Arc::new(MetadataStore::new());
        aggregate(Arc::new(store), metadata.clone(), guard, T0, RESOLUTION, TICKS, TIMEOUT).await;

        assert!(last_bucket.try_lock().is_ok());
        assert!(metadata.txs_ticks().is_empty());
    }
}
