use crate::BufferRequest;
use alloy_primitives::B256;
use async_trait::async_trait;
use derive_more::Constructor;
use opera_protocol::{Block, RecentTransaction};
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// An error reaching the [`crate::BufferActor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferClientError {
    /// The actor is no longer accepting requests.
    #[error("buffer request channel closed")]
    RequestClosed,
    /// The actor dropped the request without answering.
    #[error("buffer response channel closed")]
    ResponseClosed,
}

/// Access to the in-memory block and transaction views, abstracting the means of
/// communication with the [`crate::BufferActor`].
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait BufferClient: Debug + Send + Sync {
    /// Inserts an ingested block, recording its transactions as the most recent ones.
    ///
    /// Requests are served in order, so a lookup issued after this call returns sees the block.
    async fn add_block(&self, block: Arc<Block>) -> Result<(), BufferClientError>;

    /// Returns the buffered block with the given number.
    async fn block(&self, number: u64) -> Result<Option<Arc<Block>>, BufferClientError>;

    /// Returns the most recently inserted block.
    async fn head(&self) -> Result<Option<Arc<Block>>, BufferClientError>;

    /// Returns up to `count` buffered blocks, newest first.
    async fn latest_blocks(&self, count: usize) -> Result<Vec<Arc<Block>>, BufferClientError>;

    /// Returns up to `count` of the most recent transactions, newest first.
    async fn latest_transactions(
        &self,
        count: usize,
    ) -> Result<Vec<RecentTransaction>, BufferClientError>;

    /// Returns the recent transaction with the given hash.
    async fn recent_transaction(
        &self,
        hash: B256,
    ) -> Result<Option<RecentTransaction>, BufferClientError>;
}

/// Queue-based implementation of the [`BufferClient`] trait.
#[derive(Constructor, Debug, Clone)]
pub struct QueuedBufferClient {
    /// A channel to send the [`crate::BufferActor`] requests.
    pub requests_tx: mpsc::Sender<BufferRequest>,
}

impl QueuedBufferClient {
    async fn query<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> BufferRequest,
    ) -> Result<T, BufferClientError> {
        let (tx, rx) = oneshot::channel();
        self.requests_tx
            .send(request(tx))
            .await
            .map_err(|_| BufferClientError::RequestClosed)?;
        rx.await.map_err(|_| BufferClientError::ResponseClosed)
    }
}

#[async_trait]
impl BufferClient for QueuedBufferClient {
    async fn add_block(&self, block: Arc<Block>) -> Result<(), BufferClientError> {
        self.requests_tx
            .send(BufferRequest::AddBlock(block))
            .await
            .map_err(|_| BufferClientError::RequestClosed)
    }

    async fn block(&self, number: u64) -> Result<Option<Arc<Block>>, BufferClientError> {
        self.query(|reply| BufferRequest::Block { number, reply }).await
    }

    async fn head(&self) -> Result<Option<Arc<Block>>, BufferClientError> {
        self.query(BufferRequest::Head).await
    }

    async fn latest_blocks(&self, count: usize) -> Result<Vec<Arc<Block>>, BufferClientError> {
        self.query(|reply| BufferRequest::LatestBlocks { count, reply }).await
    }

    async fn latest_transactions(
        &self,
        count: usize,
    ) -> Result<Vec<RecentTransaction>, BufferClientError> {
        self.query(|reply| BufferRequest::LatestTransactions { count, reply }).await
    }

    async fn recent_transaction(
        &self,
        hash: B256,
    ) -> Result<Option<RecentTransaction>, BufferClientError> {
        self.query(|reply| BufferRequest::RecentTransaction { hash, reply }).await
    }
}
