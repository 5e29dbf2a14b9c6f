//! [`ExplorerActor`] implementation refreshing the fleet metrics from the meta-source.

use crate::{CancellableContext, ExplorerActor, MetadataWriter, actors::store};
use async_trait::async_trait;
use opera_protocol::TtfSample;
use opera_providers_meta::{MetaFetchError, MetaFetcher};
use opera_storage::{ExplorerStore, TtfStorage};
use std::{
    convert::Infallible,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Interval between two metadata refreshes.
pub const METADATA_TICK: Duration = Duration::from_secs(5);

/// Number of consecutive refreshes without a new block after which the chain is idle.
pub const IDLE_TICKS: u32 = 3;

/// The values published on the previous refresh.
#[derive(Debug, Default)]
struct Published {
    num_of_accounts: Option<u64>,
    disk_size_per_100m_txs: Option<u64>,
    disk_size_pruned_per_100m_txs: Option<u64>,
    time_to_finality: Option<f64>,
    time_to_block: Option<f64>,
    is_idle: Option<bool>,
}

/// Replaces `previous` with `value` and returns true if they differ.
fn changed<T: PartialEq + Copy>(previous: &mut Option<T>, value: T) -> bool {
    if *previous == Some(value) {
        return false;
    }
    *previous = Some(value);
    true
}

/// Periodically refreshes the metric cells from the [`MetaFetcher`].
///
/// A value is only written when it differs from the previous refresh. Fetch failures leave the
/// last known good value in place.
#[derive(Debug)]
pub struct MetadataObserverActor {
    fetcher: Arc<dyn MetaFetcher>,
    writer: Arc<dyn MetadataWriter>,
    store: Arc<dyn ExplorerStore>,
    tick: Duration,
    max_ttf_count: usize,
    db_timeout: Duration,
    published: Published,
    last_ingested: u64,
    idle_ticks: u32,
    cancellation: CancellationToken,
}

impl MetadataObserverActor {
    /// Creates a new [`MetadataObserverActor`].
    pub fn new(
        fetcher: Arc<dyn MetaFetcher>,
        writer: Arc<dyn MetadataWriter>,
        store: Arc<dyn ExplorerStore>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            writer,
            store,
            tick: METADATA_TICK,
            max_ttf_count: 10_000,
            db_timeout: Duration::from_secs(5),
            published: Published::default(),
            last_ingested: 0,
            idle_ticks: 0,
            cancellation,
        }
    }

    /// Overrides the refresh interval.
    pub const fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Sets the number of time-to-finality samples kept in the store.
    pub const fn with_max_ttf_count(mut self, max_ttf_count: usize) -> Self {
        self.max_ttf_count = max_ttf_count;
        self
    }

    /// Sets the bound on store calls.
    pub const fn with_db_timeout(mut self, db_timeout: Duration) -> Self {
        self.db_timeout = db_timeout;
        self
    }

    async fn refresh(&mut self) {
        match self.fetcher.num_of_accounts().await {
            Ok(value) if changed(&mut self.published.num_of_accounts, value) => {
                debug!(target: "metadata", value, "Number of accounts changed");
                self.writer.set_num_of_accounts(value);
            }
            Ok(_) => {}
            Err(err) => report("number of accounts", &err),
        }

        match self.fetcher.disk_size_per_100m_txs().await {
            Ok(value) if changed(&mut self.published.disk_size_per_100m_txs, value) => {
                debug!(target: "metadata", value, "Disk size per 100M txs changed");
                self.writer.set_disk_size_per_100m_txs(value);
            }
            Ok(_) => {}
            Err(err) => report("disk size per 100M txs", &err),
        }

        match self.fetcher.disk_size_pruned_per_100m_txs().await {
            Ok(value) if changed(&mut self.published.disk_size_pruned_per_100m_txs, value) => {
                debug!(target: "metadata", value, "Pruned disk size per 100M txs changed");
                self.writer.set_disk_size_pruned_per_100m_txs(value);
            }
            Ok(_) => {}
            Err(err) => report("pruned disk size per 100M txs", &err),
        }

        match self.fetcher.time_to_finality().await {
            Ok(value) if changed(&mut self.published.time_to_finality, value) => {
                debug!(target: "metadata", value, "Time to finality changed");
                self.writer.set_time_to_finality(value);
                self.record_ttf(value).await;
            }
            Ok(_) => {}
            Err(err) => report("time to finality", &err),
        }

        match self.fetcher.time_to_block().await {
            Ok(value) if changed(&mut self.published.time_to_block, value) => {
                debug!(target: "metadata", value, "Time to block changed");
                self.writer.set_time_to_block(value);
            }
            Ok(_) => {}
            Err(err) => report("time to block", &err),
        }

        self.refresh_idle();
    }

    /// Stores a time-to-finality sample and trims the stored samples.
    async fn record_ttf(&self, value: f64) {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let sample = TtfSample { timestamp, value };

        if let Err(err) =
            store::bounded("add_ttf_sample", self.db_timeout, self.store.add_ttf_sample(sample))
                .await
        {
            error!(target: "metadata", %err, "Failed to store time to finality sample");
            return;
        }
        if let Err(err) =
            store::bounded("shrink_ttf", self.db_timeout, self.store.shrink_ttf(self.max_ttf_count))
                .await
        {
            error!(target: "metadata", %err, "Failed to shrink time to finality samples");
        }
    }

    /// Derives the idle flag from block ingestion progress.
    fn refresh_idle(&mut self) {
        let ingested = self.writer.ingested_blocks();
        if ingested == self.last_ingested {
            self.idle_ticks = self.idle_ticks.saturating_add(1);
        } else {
            self.last_ingested = ingested;
            self.idle_ticks = 0;
        }

        let is_idle = self.idle_ticks >= IDLE_TICKS;
        if changed(&mut self.published.is_idle, is_idle) {
            if is_idle {
                warn!(target: "metadata", ticks = self.idle_ticks, "No new blocks, chain is idle");
            } else {
                debug!(target: "metadata", "Chain is producing blocks");
            }
            self.writer.set_is_idle(is_idle);
        }
    }
}

fn report(metric: &'static str, err: &MetaFetchError) {
    if err.is_not_configured() {
        trace!(target: "metadata", metric, "Metric not configured, skipping");
    } else {
        error!(target: "metadata", metric, %err, "Failed to fetch metric");
    }
}

#[async_trait]
impl ExplorerActor for MetadataObserverActor {
    type Error = Infallible;

    const NAME: &'static str = "metadata";

    async fn start(mut self) -> Result<(), Self::Error> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(target: "metadata", tick = ?self.tick, "Starting metadata observer");

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!(target: "metadata", "Received shutdown signal. Exiting metadata observer task.");
                    return Ok(());
                }
                _ = ticker.tick() => self.refresh().await,
            }
        }
    }
}

impl CancellableContext for MetadataObserverActor {
    fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockMetadataWriter;
    use mockall::{Sequence, predicate::eq};
    use opera_providers_meta::MockMetaFetcher;
    use opera_storage::{InMemoryStore, MetadataStore};
    use std::collections::VecDeque;

    /// A fetcher answering the scripted account counts and finality times, in order. Every
    /// other metric, and every metric past its script, is unconfigured.
    fn fetcher(accounts: Vec<u64>, ttf: Vec<Result<f64, MetaFetchError>>) -> MockMetaFetcher {
        let mut accounts = VecDeque::from(accounts);
        let mut ttf = VecDeque::from(ttf);

        let mut fetcher = MockMetaFetcher::new();
        fetcher.expect_num_of_accounts().returning(move || {
            accounts.pop_front().ok_or(MetaFetchError::NotConfigured("number of accounts"))
        });
        fetcher.expect_time_to_finality().returning(move || {
            ttf.pop_front().unwrap_or(Err(MetaFetchError::NotConfigured("time to finality")))
        });
        fetcher
            .expect_disk_size_per_100m_txs()
            .returning(|| Err(MetaFetchError::NotConfigured("disk size")));
        fetcher
            .expect_disk_size_pruned_per_100m_txs()
            .returning(|| Err(MetaFetchError::NotConfigured("pruned disk size")));
        fetcher
            .expect_time_to_block()
            .returning(|| Err(MetaFetchError::NotConfigured("time to block")));
        fetcher
    }

    fn observer(
        fetcher: MockMetaFetcher,
        writer: Arc<dyn MetadataWriter>,
    ) -> MetadataObserverActor {
        MetadataObserverActor::new(
            Arc::new(fetcher),
            writer,
            Arc::new(InMemoryStore::default()),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_publishes_only_changes() {
        let mut writer = MockMetadataWriter::new();
        let mut seq = Sequence::new();
        writer
            .expect_set_num_of_accounts()
            .with(eq(100))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        writer
            .expect_set_num_of_accounts()
            .with(eq(200))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        writer.expect_ingested_blocks().return_const(0u64);
        writer.expect_set_is_idle().return_const(());

        let mut observer = observer(fetcher(vec![100, 100, 200], vec![]), Arc::new(writer));
        for _ in 0..3 {
            observer.refresh().await;
        }
    }

    #[tokio::test]
    async fn test_failures_keep_the_last_value() {
        let answers =
            vec![Ok(1.5), Err(MetaFetchError::Status { metric: "ttf", status: 502 }), Ok(1.5)];
        let metadata = Arc::new(MetadataStore::new());
        let store = Arc::new(InMemoryStore::default());
        let mut observer = MetadataObserverActor::new(
            Arc::new(fetcher(vec![], answers)),
            metadata.clone(),
            store.clone(),
            CancellationToken::new(),
        );
        for _ in 0..3 {
            observer.refresh().await;
        }

        assert_eq!(metadata.time_to_finality(), 1.5);
        // Only the first value was new, so only one sample was recorded.
        assert_eq!(store.ttf_count(), 1);
    }

    #[tokio::test]
    async fn test_idle_after_quiet_ticks() {
        let metadata = Arc::new(MetadataStore::new());
        let mut observer = observer(fetcher(vec![], vec![]), metadata.clone());

        metadata.note_block(1);
        observer.refresh().await;
        assert!(!metadata.is_idle());

        for _ in 0..IDLE_TICKS - 1 {
            observer.refresh().await;
        }
        assert!(!metadata.is_idle());

        observer.refresh().await;
        assert!(metadata.is_idle());

        metadata.note_block(2);
        observer.refresh().await;
        assert!(!metadata.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_cancellation() {
        let cancellation = CancellationToken::new();
        let actor = MetadataObserverActor::new(
            Arc::new(fetcher(vec![7], vec![])),
            Arc::new(MetadataStore::new()),
            Arc::new(InMemoryStore::default()),
            cancellation.clone(),
        );
        let handle = tokio::spawn(actor.start());

        tokio::time::sleep(METADATA_TICK * 2).await;
        cancellation.cancel();
        assert!(handle.await.unwrap().is_ok());
    }
}
