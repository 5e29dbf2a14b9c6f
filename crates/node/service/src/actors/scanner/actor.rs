//! [`ExplorerActor`] implementation following the chain tip block by block.

use crate::{CancellableContext, ExplorerActor, ScanCursor, ScannerError};
use async_trait::async_trait;
use opera_protocol::Block;
use opera_providers_alloy::{HeadReceiver, UpstreamClient};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Interval between catch-up passes.
pub const SCAN_TICK: Duration = Duration::from_millis(5);

/// Capacity of the channel between the scanner and the observer.
pub const BLOCK_CHANNEL_CAPACITY: usize = 10_000;

/// Turns the upstream head feed into a gap-free, strictly ascending stream of blocks.
///
/// Sending a block waits for room in the output channel, which is how a slow observer
/// throttles the scanner. A failed fetch is retried on the next tick without advancing.
#[derive(Debug)]
pub struct BlockScannerActor {
    upstream: Arc<dyn UpstreamClient>,
    heads: HeadReceiver,
    blocks_tx: mpsc::Sender<Arc<Block>>,
    tick: Duration,
    cursor: ScanCursor,
    cancellation: CancellationToken,
}

impl BlockScannerActor {
    /// Creates a new [`BlockScannerActor`].
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        heads: HeadReceiver,
        blocks_tx: mpsc::Sender<Arc<Block>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            upstream,
            heads,
            blocks_tx,
            tick: SCAN_TICK,
            cursor: ScanCursor::default(),
            cancellation,
        }
    }

    /// Overrides the catch-up interval.
    pub const fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Fetches and emits every pending block. Returns false once the scanner should stop.
    async fn catch_up(&mut self) -> bool {
        while let Some(number) = self.cursor.pending() {
            let block = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => return false,
                block = self.upstream.block_by_number(number) => block,
            };

            let block = match block {
                Ok(block) => block,
                Err(err) if err.is_not_found() => {
                    debug!(target: "scanner", number, "Block not available yet, retrying on next tick");
                    return true;
                }
                Err(err) => {
                    warn!(target: "scanner", number, %err, "Failed to fetch block, retrying on next tick");
                    return true;
                }
            };

            trace!(target: "scanner", number, txs = block.transaction_count(), "Scanned block");
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => return false,
                sent = self.blocks_tx.send(Arc::new(block)) => {
                    if sent.is_err() {
                        info!(target: "scanner", "Block channel closed. Exiting scanner task.");
                        return false;
                    }
                }
            }
            self.cursor.advance();

            #[cfg(feature = "metrics")]
            metrics::gauge!(crate::Metrics::SCANNER_LAG).set(self.cursor.lag() as f64);
        }
        true
    }
}

#[async_trait]
impl ExplorerActor for BlockScannerActor {
    type Error = ScannerError;

    const NAME: &'static str = "scanner";

    async fn start(mut self) -> Result<(), Self::Error> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(target: "scanner", tick = ?self.tick, "Starting block scanner");

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!(target: "scanner", "Received shutdown signal. Exiting scanner task.");
                    return Ok(());
                }
                head = self.heads.recv() => {
                    let Some(head) = head else {
                        warn!(target: "scanner", "Head feed closed. Exiting scanner task.");
                        return Err(ScannerError::HeadFeedClosed);
                    };
                    if self.cursor.next().is_none() {
                        info!(target: "scanner", head, "Starting at the chain tip");
                    }
                    self.cursor.on_head(head);

                    #[cfg(feature = "metrics")]
                    metrics::gauge!(crate::Metrics::HEAD_HEIGHT).set(head as f64);
                }
                _ = ticker.tick() => {
                    if !self.catch_up().await {
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl CancellableContext for BlockScannerActor {
    fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opera_providers_alloy::{MockUpstreamClient, UpstreamError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn scanner(
        upstream: MockUpstreamClient,
        heads: &[u64],
    ) -> (BlockScannerActor, mpsc::Receiver<Arc<Block>>, CancellationToken) {
        let (heads_tx, heads_rx) = mpsc::channel(16);
        for head in heads {
            heads_tx.try_send(*head).unwrap();
        }
        // Keep the feed open for the duration of the test.
        std::mem::forget(heads_tx);

        let (blocks_tx, blocks_rx) = mpsc::channel(16);
        let cancellation = CancellationToken::new();
        let actor = BlockScannerActor::new(
            Arc::new(upstream),
            HeadReceiver::new(heads_rx),
            blocks_tx,
            cancellation.clone(),
        );
        (actor, blocks_rx, cancellation)
    }

    #[tokio::test(start_paused = true)]
    async fn test_catches_up_to_the_latest_head() {
        let mut upstream = MockUpstreamClient::new();
        upstream
            .expect_block_by_number()
            .returning(|number| Ok(Block { number, ..Default::default() }));

        let (actor, mut blocks_rx, cancellation) = scanner(upstream, &[100, 103]);
        let handle = tokio::spawn(actor.start());

        let mut numbers = Vec::new();
        for _ in 0..4 {
            numbers.push(blocks_rx.recv().await.unwrap().number);
        }
        assert_eq!(numbers, vec![100, 101, 102, 103]);

        // Nothing past the target.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(blocks_rx.try_recv().is_err());

        cancellation.cancel();
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_retried_without_gaps() {
        let failed_once = Arc::new(AtomicBool::new(false));
        let mut upstream = MockUpstreamClient::new();
        upstream.expect_block_by_number().returning(move |number| {
            if number == 6 && !failed_once.swap(true, Ordering::SeqCst) {
                return Err(UpstreamError::Timeout(Duration::from_secs(5)));
            }
            Ok(Block { number, ..Default::default() })
        });

        let (actor, mut blocks_rx, cancellation) = scanner(upstream, &[5, 7]);
        tokio::spawn(actor.start());

        let mut numbers = Vec::new();
        for _ in 0..3 {
            numbers.push(blocks_rx.recv().await.unwrap().number);
        }
        assert_eq!(numbers, vec![5, 6, 7]);
        cancellation.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_head_feed_stops_the_scanner() {
        let (heads_tx, heads_rx) = mpsc::channel(1);
        drop(heads_tx);
        let (blocks_tx, _blocks_rx) = mpsc::channel(1);

        let actor = BlockScannerActor::new(
            Arc::new(MockUpstreamClient::new()),
            HeadReceiver::new(heads_rx),
            blocks_tx,
            CancellationToken::new(),
        );
        assert_eq!(actor.start().await, Err(ScannerError::HeadFeedClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_the_observer_is_gone() {
        let mut upstream = MockUpstreamClient::new();
        upstream
            .expect_block_by_number()
            .returning(|number| Ok(Block { number, ..Default::default() }));

        let (actor, blocks_rx, _cancellation) = scanner(upstream, &[1]);
        drop(blocks_rx);
        assert_eq!(actor.start().await, Ok(()));
    }
}
