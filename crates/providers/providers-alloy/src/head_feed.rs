//! The upstream head feed.
//!
//! A single background worker per upstream turns new-head notifications into a bounded
//! channel of block numbers. The worker starts with a push subscription. If the very first
//! subscription attempt fails, the transport cannot subscribe and the worker polls the
//! latest block number instead. A push subscription that drops later is re-established
//! after [`SUBSCRIBE_RETRY_INTERVAL`].

use crate::UpstreamError;
use alloy_primitives::B256;
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::{
    sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
    },
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

/// Delay before re-establishing a dropped push subscription.
pub const SUBSCRIBE_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between latest-block polls in poll mode.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capacity of the head channel. Heads are dropped, not queued, once it is full.
pub const HEAD_CHANNEL_CAPACITY: usize = 10_000;

/// A live new-heads subscription.
pub struct HeadSubscription {
    id: Option<B256>,
    heads: BoxStream<'static, u64>,
}

impl HeadSubscription {
    /// Creates a new [`HeadSubscription`] from the upstream subscription id and the stream of
    /// head numbers. The stream ends when the subscription drops.
    pub fn new(id: Option<B256>, heads: BoxStream<'static, u64>) -> Self {
        Self { id, heads }
    }

    /// Returns the upstream subscription id, if any.
    pub const fn id(&self) -> Option<B256> {
        self.id
    }
}

impl Debug for HeadSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadSubscription").field("id", &self.id).finish_non_exhaustive()
    }
}

/// The upstream side of the head feed.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait HeadSource: Debug + Send + Sync {
    /// Opens a push subscription to new heads.
    async fn subscribe_new_heads(&self) -> Result<HeadSubscription, UpstreamError>;

    /// Returns the latest block number known upstream.
    async fn latest_block_number(&self) -> Result<u64, UpstreamError>;

    /// Cancels the push subscription with the given id.
    async fn unsubscribe(&self, id: B256) -> Result<(), UpstreamError>;
}

/// Tunables of the [`HeadFeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadFeedConfig {
    /// The head channel capacity.
    pub capacity: usize,
    /// The poll mode interval.
    pub poll_interval: Duration,
    /// The resubscription delay in push mode.
    pub retry_interval: Duration,
}

impl Default for HeadFeedConfig {
    fn default() -> Self {
        Self {
            capacity: HEAD_CHANNEL_CAPACITY,
            poll_interval: POLL_INTERVAL,
            retry_interval: SUBSCRIBE_RETRY_INTERVAL,
        }
    }
}

/// The receiving end of the head feed.
///
/// Clones share the same underlying channel, so every head is delivered to exactly one
/// receiver.
#[derive(Debug, Clone)]
pub struct HeadReceiver {
    inner: Arc<Mutex<mpsc::Receiver<u64>>>,
}

impl HeadReceiver {
    /// Wraps a raw head channel.
    pub fn new(receiver: mpsc::Receiver<u64>) -> Self {
        Self { inner: Arc::new(Mutex::new(receiver)) }
    }

    /// Receives the next head number. Returns `None` once the feed has shut down.
    pub async fn recv(&self) -> Option<u64> {
        self.inner.lock().await.recv().await
    }
}

/// Lazily started head feed of one upstream.
#[derive(Debug)]
pub struct HeadFeed {
    source: Arc<dyn HeadSource>,
    config: HeadFeedConfig,
    receiver: OnceLock<HeadReceiver>,
    cancellation: CancellationToken,
}

impl HeadFeed {
    /// Creates a new [`HeadFeed`] over the given source. The worker is not started until the
    /// first call to [`HeadFeed::subscribe`].
    pub fn new(source: Arc<dyn HeadSource>) -> Self {
        Self::with_config(source, HeadFeedConfig::default())
    }

    /// Creates a new [`HeadFeed`] with custom tunables.
    pub fn with_config(source: Arc<dyn HeadSource>, config: HeadFeedConfig) -> Self {
        Self { source, config, receiver: OnceLock::new(), cancellation: CancellationToken::new() }
    }

    /// Returns the head receiver, starting the worker on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> HeadReceiver {
        self.receiver
            .get_or_init(|| {
                let (tx, rx) = mpsc::channel(self.config.capacity.max(1));
                let worker = HeadFeedWorker {
                    source: Arc::clone(&self.source),
                    tx,
                    config: self.config,
                    cancellation: self.cancellation.clone(),
                };
                tokio::spawn(worker.run());
                HeadReceiver::new(rx)
            })
            .clone()
    }

    /// Stops the worker. The receiver yields `None` once buffered heads are drained.
    pub fn close(&self) {
        self.cancellation.cancel();
    }
}

impl Drop for HeadFeed {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

struct HeadFeedWorker {
    source: Arc<dyn HeadSource>,
    tx: mpsc::Sender<u64>,
    config: HeadFeedConfig,
    cancellation: CancellationToken,
}

impl HeadFeedWorker {
    async fn run(self) {
        match self.source.subscribe_new_heads().await {
            Ok(subscription) => {
                info!(target: "head_feed", id = ?subscription.id(), "Subscribed to new heads");
                self.run_push(subscription).await;
            }
            Err(err) => {
                warn!(target: "head_feed", %err, "Push subscription unavailable, polling for new heads");
                self.run_poll().await;
            }
        }
        info!(target: "head_feed", "Head feed stopped");
    }

    async fn run_push(&self, mut subscription: HeadSubscription) {
        loop {
            loop {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => {
                        self.unsubscribe(subscription).await;
                        return;
                    }
                    head = subscription.heads.next() => match head {
                        Some(number) => {
                            if !self.emit(number) {
                                self.unsubscribe(subscription).await;
                                return;
                            }
                        }
                        None => break,
                    }
                }
            }

            warn!(
                target: "head_feed",
                retry_in = ?self.config.retry_interval,
                "Head subscription dropped"
            );
            subscription = loop {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => return,
                    _ = tokio::time::sleep(self.config.retry_interval) => {}
                }
                match self.source.subscribe_new_heads().await {
                    Ok(subscription) => {
                        info!(target: "head_feed", id = ?subscription.id(), "Resubscribed to new heads");
                        break subscription;
                    }
                    Err(err) => {
                        warn!(target: "head_feed", %err, "Failed to resubscribe to new heads");
                    }
                }
            };
        }
    }

    async fn run_poll(&self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last: Option<u64> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => return,
                _ = ticker.tick() => {
                    match self.source.latest_block_number().await {
                        Ok(number) if last.is_none_or(|last| number > last) => {
                            last = Some(number);
                            if !self.emit(number) {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(target: "head_feed", %err, "Failed to poll the latest block number");
                        }
                    }
                }
            }
        }
    }

    /// Pushes a head without blocking. Returns false once every receiver is gone.
    fn emit(&self, number: u64) -> bool {
        match self.tx.try_send(number) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(target: "head_feed", number, "Head channel full, dropping head");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    async fn unsubscribe(&self, subscription: HeadSubscription) {
        let HeadSubscription { id, heads } = subscription;
        drop(heads);
        if let Some(id) = id {
            if let Err(err) = self.source.unsubscribe(id).await {
                debug!(target: "head_feed", %err, "Failed to unsubscribe from new heads");
            }
        }
    }
}
