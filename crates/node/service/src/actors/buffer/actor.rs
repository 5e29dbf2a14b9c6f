//! The [`BufferActor`], sole owner of the in-memory block and transaction views.

use crate::{CancellableContext, ExplorerActor, QueuedBufferClient};
use alloy_primitives::B256;
use async_trait::async_trait;
use opera_buffers::{BlockBuffer, RecencyBuffer};
use opera_protocol::{Block, RecentTransaction};
use std::{convert::Infallible, num::NonZeroUsize, sync::Arc};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Capacity of the buffer request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 1024;

/// Capacities of the in-memory views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Number of blocks kept in the cyclic block buffer.
    pub blocks: NonZeroUsize,
    /// Number of transactions kept in the recency buffer.
    pub transactions: NonZeroUsize,
}

/// A request served by the [`BufferActor`].
#[derive(Debug)]
pub enum BufferRequest {
    /// Insert an ingested block.
    AddBlock(Arc<Block>),
    /// Look a block up by number.
    Block {
        /// The block number.
        number: u64,
        /// The response channel.
        reply: oneshot::Sender<Option<Arc<Block>>>,
    },
    /// Return the most recently inserted block.
    Head(oneshot::Sender<Option<Arc<Block>>>),
    /// Return the newest blocks.
    LatestBlocks {
        /// The maximum number of blocks.
        count: usize,
        /// The response channel.
        reply: oneshot::Sender<Vec<Arc<Block>>>,
    },
    /// Return the newest transactions.
    LatestTransactions {
        /// The maximum number of transactions.
        count: usize,
        /// The response channel.
        reply: oneshot::Sender<Vec<RecentTransaction>>,
    },
    /// Look a recent transaction up by hash.
    RecentTransaction {
        /// The transaction hash.
        hash: B256,
        /// The response channel.
        reply: oneshot::Sender<Option<RecentTransaction>>,
    },
}

/// Owns the [`BlockBuffer`] and the recent transactions [`RecencyBuffer`].
///
/// Neither buffer is thread-safe; serving every access from this actor's task serializes
/// all mutations, and readers never observe a half-applied insert.
#[derive(Debug)]
pub struct BufferActor {
    blocks: BlockBuffer,
    transactions: RecencyBuffer<B256, RecentTransaction>,
    requests_rx: mpsc::Receiver<BufferRequest>,
    cancellation: CancellationToken,
}

impl BufferActor {
    /// Creates a new [`BufferActor`] and the client to reach it.
    pub fn new(
        config: BufferConfig,
        cancellation: CancellationToken,
    ) -> (QueuedBufferClient, Self) {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let actor = Self {
            blocks: BlockBuffer::new(config.blocks),
            transactions: RecencyBuffer::new(config.transactions),
            requests_rx,
            cancellation,
        };
        (QueuedBufferClient::new(requests_tx), actor)
    }

    fn handle(&mut self, request: BufferRequest) {
        // A dropped reply only means the caller gave up waiting.
        match request {
            BufferRequest::AddBlock(block) => self.add_block(block),
            BufferRequest::Block { number, reply } => {
                let _ = reply.send(self.blocks.get(number));
            }
            BufferRequest::Head(reply) => {
                let _ = reply.send(self.blocks.head());
            }
            BufferRequest::LatestBlocks { count, reply } => {
                let _ = reply.send(self.blocks.latest(count));
            }
            BufferRequest::LatestTransactions { count, reply } => {
                let _ = reply.send(self.transactions.latest(count).into_iter().copied().collect());
            }
            BufferRequest::RecentTransaction { hash, reply } => {
                let _ = reply.send(self.transactions.get(&hash).copied());
            }
        }
    }

    fn add_block(&mut self, block: Arc<Block>) {
        for (index, hash) in block.transactions.iter().enumerate() {
            self.transactions.add(
                *hash,
                RecentTransaction {
                    hash: *hash,
                    block_number: block.number,
                    timestamp: block.timestamp,
                    index: index as u64,
                },
            );
        }
        trace!(target: "buffers", number = block.number, txs = block.transactions.len(), "Buffered block");
        self.blocks.add(block);

        #[cfg(feature = "metrics")]
        metrics::gauge!(crate::Metrics::BUFFERED_BLOCKS).set(self.blocks.len() as f64);
    }
}

#[async_trait]
impl ExplorerActor for BufferActor {
    type Error = Infallible;

    const NAME: &'static str = "buffer";

    async fn start(mut self) -> Result<(), Self::Error> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!(target: "buffers", "Received shutdown signal. Exiting buffer actor task.");
                    return Ok(());
                }
                request = self.requests_rx.recv() => match request {
                    Some(request) => self.handle(request),
                    None => {
                        debug!(target: "buffers", "All buffer clients dropped. Exiting buffer actor task.");
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl CancellableContext for BufferActor {
    fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferClient, BufferClientError};

    fn block(number: u64, txs: &[u8]) -> Arc<Block> {
        Arc::new(Block {
            number,
            timestamp: 1_000 + number,
            transactions: txs.iter().map(|b| B256::repeat_byte(*b)).collect(),
            ..Default::default()
        })
    }

    fn spawn(blocks: usize, transactions: usize) -> (QueuedBufferClient, CancellationToken) {
        let cancellation = CancellationToken::new();
        let config = BufferConfig {
            blocks: NonZeroUsize::new(blocks).unwrap(),
            transactions: NonZeroUsize::new(transactions).unwrap(),
        };
        let (client, actor) = BufferActor::new(config, cancellation.clone());
        tokio::spawn(actor.start());
        (client, cancellation)
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let (client, _cancellation) = spawn(5, 10);

        let b = block(3, &[0xaa]);
        client.add_block(b.clone()).await.unwrap();

        assert_eq!(client.block(3).await.unwrap(), Some(b.clone()));
        assert_eq!(client.head().await.unwrap(), Some(b));
        assert_eq!(client.block(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_latest_blocks_newest_first() {
        let (client, _cancellation) = spawn(5, 10);
        for number in 14..=23 {
            client.add_block(block(number, &[])).await.unwrap();
        }

        let latest: Vec<u64> =
            client.latest_blocks(3).await.unwrap().iter().map(|b| b.number).collect();
        assert_eq!(latest, vec![23, 22, 21]);
        assert_eq!(client.block(18).await.unwrap(), None);
        assert!(client.block(19).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_recent_transactions() {
        let (client, _cancellation) = spawn(5, 3);
        client.add_block(block(1, &[0x01, 0x02])).await.unwrap();
        client.add_block(block(2, &[0x03, 0x04])).await.unwrap();

        let latest: Vec<B256> =
            client.latest_transactions(10).await.unwrap().iter().map(|tx| tx.hash).collect();
        assert_eq!(
            latest,
            vec![B256::repeat_byte(0x04), B256::repeat_byte(0x03), B256::repeat_byte(0x02)]
        );

        // The oldest transaction was evicted.
        assert_eq!(client.recent_transaction(B256::repeat_byte(0x01)).await.unwrap(), None);

        let tx = client.recent_transaction(B256::repeat_byte(0x04)).await.unwrap().unwrap();
        assert_eq!(tx.block_number, 2);
        assert_eq!(tx.timestamp, 1_002);
        assert_eq!(tx.index, 1);
    }

    #[tokio::test]
    async fn test_requests_fail_after_shutdown() {
        let (client, cancellation) = spawn(5, 10);
        cancellation.cancel();

        // Wait for the actor to observe the cancellation and drop its receiver.
        while !client.requests_tx.is_closed() {
            tokio::task::yield_now().await;
        }
        assert_eq!(client.head().await, Err(BufferClientError::RequestClosed));
    }
}
