//! [`ExplorerActor`] implementation ingesting scanned blocks.

use super::workers;
use crate::{BufferClient, CancellableContext, ExplorerActor, ObserverError, actors::store};
use async_trait::async_trait;
use opera_protocol::{AGGREGATION_RESOLUTION, AGGREGATION_TICKS, Block, aggregation_bucket};
use opera_providers_alloy::UpstreamClient;
use opera_storage::{
    AggregationStorage, BlockRecord, BlockStorage, ExplorerStore, MetadataStore,
    TransactionStorage,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};
use tokio_util::{
    sync::{CancellationToken, WaitForCancellationFuture},
    task::TaskTracker,
};

/// Seconds a block must be past the start of its bucket before it triggers a recompute, so
/// late blocks of the same bucket are still counted.
pub const AGGREGATION_GRACE: u64 = 1;

/// Number of persisted blocks between two transaction shrinks.
pub const SHRINK_EVERY_BLOCKS: u64 = 100;

/// Tunables of the [`BlockObserverActor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Whether per-transaction rows are persisted.
    pub is_persisted: bool,
    /// Number of transaction rows kept by the periodic shrink.
    pub max_txs_count: usize,
    /// Bound on every store call.
    pub db_timeout: Duration,
    /// Width of an aggregation bucket, in seconds.
    pub resolution: u64,
    /// Number of buckets in a published series.
    pub ticks: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            is_persisted: false,
            max_txs_count: 100_000,
            db_timeout: Duration::from_secs(5),
            resolution: AGGREGATION_RESOLUTION,
            ticks: AGGREGATION_TICKS,
        }
    }
}

/// Ingests the scanner's blocks in order.
///
/// Buffer insertion, the transaction counter and the per-block record run on this actor's
/// task, so they are applied in block order by a single writer. Series recompute and
/// transaction persistence are forked onto tracked workers; shutdown waits for them.
#[derive(Debug)]
pub struct BlockObserverActor {
    blocks_rx: mpsc::Receiver<Arc<Block>>,
    buffer: Arc<dyn BufferClient>,
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn ExplorerStore>,
    metadata: Arc<MetadataStore>,
    config: ObserverConfig,
    /// The last published aggregation bucket. Held while a recompute is in flight.
    last_bucket: Arc<Mutex<u64>>,
    persisted_blocks: u64,
    workers: TaskTracker,
    cancellation: CancellationToken,
}

impl BlockObserverActor {
    /// Creates a new [`BlockObserverActor`].
    pub fn new(
        blocks_rx: mpsc::Receiver<Arc<Block>>,
        buffer: Arc<dyn BufferClient>,
        upstream: Arc<dyn UpstreamClient>,
        store: Arc<dyn ExplorerStore>,
        metadata: Arc<MetadataStore>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            blocks_rx,
            buffer,
            upstream,
            store,
            metadata,
            config: ObserverConfig::default(),
            last_bucket: Arc::new(Mutex::new(0)),
            persisted_blocks: 0,
            workers: TaskTracker::new(),
            cancellation,
        }
    }

    /// Sets the observer tunables.
    pub const fn with_config(mut self, config: ObserverConfig) -> Self {
        self.config = config;
        self
    }

    async fn ingest(&mut self, block: Arc<Block>) -> Result<(), ObserverError> {
        let txs = block.transaction_count() as u64;
        let timeout = self.config.db_timeout;

        self.buffer.add_block(Arc::clone(&block)).await?;
        self.metadata.note_block(block.number);

        if let Err(err) =
            store::bounded("increment_trx_count", timeout, self.store.increment_trx_count(txs))
                .await
        {
            error!(target: "observer", number = block.number, %err, "Failed to increment transaction counter");
        }
        if let Err(err) =
            store::bounded("add_block", timeout, self.store.add_block(BlockRecord::from(&*block)))
                .await
        {
            error!(target: "observer", number = block.number, %err, "Failed to store block record");
        }

        debug!(target: "observer", number = block.number, txs, "Ingested block");

        #[cfg(feature = "metrics")]
        metrics::counter!(crate::Metrics::INGESTED_TRANSACTIONS).increment(txs);

        self.maybe_aggregate(&block);
        if self.config.is_persisted {
            self.persist(block);
        }
        Ok(())
    }

    /// Forks a series recompute if `block` opens a new bucket and no recompute is in flight.
    fn maybe_aggregate(&self, block: &Block) {
        let bucket = aggregation_bucket(block.timestamp, self.config.resolution);
        if block.timestamp <= bucket + AGGREGATION_GRACE {
            return;
        }

        let Ok(last_bucket) = Arc::clone(&self.last_bucket).try_lock_owned() else {
            trace!(target: "observer", bucket, "Aggregation already in flight");
            return;
        };
        if *last_bucket >= bucket {
            return;
        }

        let store: Arc<dyn AggregationStorage> = Arc::<dyn ExplorerStore>::clone(&self.store);
        self.workers.spawn(workers::aggregate(
            store,
            Arc::clone(&self.metadata),
            last_bucket,
            bucket,
            self.config.resolution,
            self.config.ticks,
            self.config.db_timeout,
        ));
    }

    fn persist(&mut self, block: Arc<Block>) {
        self.persisted_blocks += 1;
        let shrink_to = self
            .persisted_blocks
            .is_multiple_of(SHRINK_EVERY_BLOCKS)
            .then_some(self.config.max_txs_count);

        self.workers.spawn(workers::persist(
            Arc::clone(&self.upstream),
            Arc::clone(&self.store),
            block,
            self.config.db_timeout,
            shrink_to,
        ));
    }

    /// Ingests whatever the scanner already queued, then waits for the forked workers.
    async fn drain(&mut self) -> Result<(), ObserverError> {
        let mut result = Ok(());
        while let Ok(block) = self.blocks_rx.try_recv() {
            if let Err(err) = self.ingest(block).await {
                result = Err(err);
                break;
            }
        }
        self.blocks_rx.close();

        self.workers.close();
        self.workers.wait().await;
        result
    }
}

#[async_trait]
impl ExplorerActor for BlockObserverActor {
    type Error = ObserverError;

    const NAME: &'static str = "observer";

    async fn start(mut self) -> Result<(), Self::Error> {
        info!(
            target: "observer",
            persisted = self.config.is_persisted,
            resolution = self.config.resolution,
            "Starting block observer"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!(target: "observer", "Received shutdown signal. Draining observer task.");
                    return self.drain().await;
                }
                block = self.blocks_rx.recv() => {
                    let Some(block) = block else {
                        info!(target: "observer", "Block channel closed. Exiting observer task.");
                        return self.drain().await;
                    };
                    if let Err(err) = self.ingest(block).await {
                        error!(target: "observer", %err, "Failed to ingest block");
                        self.workers.close();
                        self.workers.wait().await;
                        return Err(err);
                    }
                }
            }
        }
    }
}

impl CancellableContext for BlockObserverActor {
    fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferActor, BufferConfig, MockBufferClient};
    use alloy_primitives::{Address, B256, address};
    use opera_protocol::Transaction;
    use opera_providers_alloy::{MockUpstreamClient, UpstreamError};
    use opera_storage::InMemoryStore;
    use std::num::NonZeroUsize;

    const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

    /// Bucket start used by the tests, aligned to the aggregation resolution.
    const T0: u64 = 1_689_601_270;

    fn block(number: u64, timestamp: u64, txs: &[u8]) -> Arc<Block> {
        Arc::new(Block {
            number,
            timestamp,
            gas_used: 21_000 * txs.len() as u64,
            transactions: txs.iter().map(|b| B256::repeat_byte(*b)).collect(),
            ..Default::default()
        })
    }

    struct Harness {
        blocks_tx: mpsc::Sender<Arc<Block>>,
        buffer: crate::QueuedBufferClient,
        store: Arc<InMemoryStore>,
        metadata: Arc<MetadataStore>,
        observer: BlockObserverActor,
    }

    fn harness(upstream: MockUpstreamClient, config: ObserverConfig) -> Harness {
        let (blocks_tx, blocks_rx) = mpsc::channel(64);
        let buffer_config = BufferConfig {
            blocks: NonZeroUsize::new(16).unwrap(),
            transactions: NonZeroUsize::new(16).unwrap(),
        };
        let (buffer, buffer_actor) = BufferActor::new(buffer_config, CancellationToken::new());
        tokio::spawn(buffer_actor.start());

        let store = Arc::new(InMemoryStore::default());
        let metadata = Arc::new(MetadataStore::new());
        let observer = BlockObserverActor::new(
            blocks_rx,
            Arc::new(buffer.clone()),
            Arc::new(upstream),
            store.clone(),
            metadata.clone(),
            CancellationToken::new(),
        )
        .with_config(config);
        Harness { blocks_tx, buffer, store, metadata, observer }
    }

    #[tokio::test]
    async fn test_ingest_updates_buffer_and_counters() {
        let Harness { blocks_tx, buffer, store, metadata, observer } =
            harness(MockUpstreamClient::new(), ObserverConfig::default());

        blocks_tx.send(block(1, T0 + 1, &[0x01, 0x02])).await.unwrap();
        blocks_tx.send(block(2, T0 + 1, &[0x03])).await.unwrap();
        drop(blocks_tx);
        observer.start().await.unwrap();

        assert_eq!(buffer.block(1).await.unwrap().unwrap().number, 1);
        assert_eq!(buffer.head().await.unwrap().unwrap().number, 2);
        assert_eq!(store.trx_count().await.unwrap(), 3);
        assert_eq!(store.block(2).await.unwrap().txs_count, 1);
        assert_eq!(metadata.ingested_blocks(), 2);
        assert_eq!(metadata.snapshot().head_number, Some(2));
    }

    #[tokio::test]
    async fn test_aggregation_respects_grace_period() {
        let Harness { blocks_tx, store: _store, metadata, observer, .. } =
            harness(MockUpstreamClient::new(), ObserverConfig::default());

        // Exactly at the grace boundary: no recompute.
        blocks_tx.send(block(1, T0 + AGGREGATION_GRACE, &[0x01])).await.unwrap();
        drop(blocks_tx);
        observer.start().await.unwrap();

        assert!(metadata.txs_ticks().is_empty());
        assert_eq!(metadata.snapshot().aggregated_at, None);
    }

    #[tokio::test]
    async fn test_aggregation_publishes_series() {
        let Harness { blocks_tx, metadata, observer, .. } =
            harness(MockUpstreamClient::new(), ObserverConfig::default());

        // Within the grace period of its bucket, so only block 2 triggers a recompute.
        blocks_tx.send(block(1, T0 - 9, &[0x01, 0x02])).await.unwrap();
        blocks_tx.send(block(2, T0 + 2, &[0x03])).await.unwrap();
        drop(blocks_tx);
        observer.start().await.unwrap();

        let txs = metadata.txs_ticks();
        assert_eq!(txs.len(), AGGREGATION_TICKS);
        assert_eq!(metadata.snapshot().aggregated_at, Some(T0));

        // Block 1 lands in the last bucket, block 2 is past the series end.
        let last = txs.last().unwrap();
        assert_eq!(last.timestamp, T0);
        assert_eq!(last.value, 2);
        assert_eq!(metadata.gas_ticks().last().unwrap().value, 42_000);
    }

    #[tokio::test]
    async fn test_aggregation_bucket_only_moves_forward() {
        let Harness { blocks_tx, metadata, observer, .. } =
            harness(MockUpstreamClient::new(), ObserverConfig::default());

        blocks_tx.send(block(1, T0 + 12, &[])).await.unwrap();
        blocks_tx.send(block(2, T0 + 5, &[])).await.unwrap();
        drop(blocks_tx);
        observer.start().await.unwrap();

        assert_eq!(metadata.snapshot().aggregated_at, Some(T0 + 10));
    }

    #[tokio::test]
    async fn test_recompute_in_flight_is_skipped() {
        let Harness { mut observer, metadata, .. } =
            harness(MockUpstreamClient::new(), ObserverConfig::default());
        let trigger = block(1, T0 + 2, &[0x01]);

        let in_flight = Arc::clone(&observer.last_bucket).try_lock_owned().unwrap();
        observer.maybe_aggregate(&trigger);
        assert_eq!(observer.workers.len(), 0);

        drop(in_flight);
        observer.maybe_aggregate(&trigger);
        assert_eq!(observer.workers.len(), 1);

        observer.workers.close();
        observer.workers.wait().await;
        assert_eq!(metadata.snapshot().aggregated_at, Some(T0));
        assert_eq!(*observer.last_bucket.lock().await, T0);

        // The same bucket is not recomputed twice.
        observer.maybe_aggregate(&trigger);
        assert!(observer.workers.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_indexes_addresses() {
        let mut upstream = MockUpstreamClient::new();
        upstream.expect_transaction().returning(|hash| {
            if hash == B256::repeat_byte(0x02) {
                return Err(UpstreamError::TransactionNotFound(hash));
            }
            Ok(Transaction { hash, from: ALICE, to: Some(BOB), ..Default::default() })
        });
        let config = ObserverConfig { is_persisted: true, ..Default::default() };
        let Harness { blocks_tx, store, observer, .. } = harness(upstream, config);

        blocks_tx.send(block(7, T0 + 1, &[0x01, 0x02])).await.unwrap();
        drop(blocks_tx);
        observer.start().await.unwrap();

        let rows = store.transactions_where_address(BOB).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hash, B256::repeat_byte(0x01));
        assert_eq!(rows[0].block_number, 7);
        assert_eq!(rows[0].addresses, vec![ALICE, BOB]);
    }

    #[tokio::test]
    async fn test_buffer_failure_stops_the_observer() {
        let mut buffer = MockBufferClient::new();
        buffer.expect_add_block().returning(|_| Err(crate::BufferClientError::RequestClosed));

        let (blocks_tx, blocks_rx) = mpsc::channel(4);
        let observer = BlockObserverActor::new(
            blocks_rx,
            Arc::new(buffer),
            Arc::new(MockUpstreamClient::new()),
            Arc::new(InMemoryStore::default()),
            Arc::new(MetadataStore::new()),
            CancellationToken::new(),
        );
        blocks_tx.send(block(1, T0, &[])).await.unwrap();

        let err = observer.start().await.unwrap_err();
        assert!(matches!(err, ObserverError::Buffer(_)));
    }

    #[tokio::test]
    async fn test_cancellation_drains_queued_blocks() {
        let Harness { blocks_tx, buffer, observer, .. } =
            harness(MockUpstreamClient::new(), ObserverConfig::default());
        let cancellation = observer.cancellation.clone();

        for number in 1..=3 {
            blocks_tx.send(block(number, T0, &[])).await.unwrap();
        }
        cancellation.cancel();
        observer.start().await.unwrap();

        assert_eq!(buffer.head().await.unwrap().unwrap().number, 3);
        assert!(blocks_tx.send(block(4, T0, &[])).await.is_err());
    }
}
