//! The read-only query surface over a running explorer.

use crate::{BufferClient, BufferClientError};
use alloy_primitives::{Address, B256, Bytes, U256};
use derive_more::Constructor;
use opera_protocol::{
    AGGREGATION_RESOLUTION, AGGREGATION_TICKS, Block, CountTick, FloatTick, RecentTransaction,
    Transaction, aggregation_bucket,
};
use opera_providers_alloy::{UpstreamClient, UpstreamError};
use opera_storage::{
    AggregationStorage, ExplorerStore, Metadata, MetadataStore, StorageError, TransactionRecord,
    TransactionStorage,
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// An error answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The buffer actor is not reachable.
    #[error(transparent)]
    Buffer(#[from] BufferClientError),
    /// The upstream node failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StorageError),
}

/// Answers reads from the buffers and the metadata cells, delegating to the upstream node
/// and the store for what they do not hold.
#[derive(Debug, Clone, Constructor)]
pub struct ExplorerQueries {
    buffer: Arc<dyn BufferClient>,
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn ExplorerStore>,
    metadata: Arc<MetadataStore>,
}

impl ExplorerQueries {
    /// Returns the most recently ingested block.
    pub async fn latest_block(&self) -> Result<Option<Arc<Block>>, QueryError> {
        Ok(self.buffer.head().await?)
    }

    /// Returns up to `count` of the newest buffered blocks, newest first.
    pub async fn latest_blocks(&self, count: usize) -> Result<Vec<Arc<Block>>, QueryError> {
        Ok(self.buffer.latest_blocks(count).await?)
    }

    /// Returns the block with the given number, from the buffer if it holds it and from the
    /// upstream node otherwise.
    pub async fn block(&self, number: u64) -> Result<Option<Arc<Block>>, QueryError> {
        if let Some(block) = self.buffer.block(number).await? {
            return Ok(Some(block));
        }

        trace!(target: "explorer", number, "Block not buffered, asking upstream");
        match self.upstream.block_by_number(number).await {
            Ok(block) => Ok(Some(Arc::new(block))),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns up to `count` of the most recent transactions, newest first.
    pub async fn latest_transactions(
        &self,
        count: usize,
    ) -> Result<Vec<RecentTransaction>, QueryError> {
        Ok(self.buffer.latest_transactions(count).await?)
    }

    /// Returns the recent transaction with the given hash.
    pub async fn recent_transaction(
        &self,
        hash: B256,
    ) -> Result<Option<RecentTransaction>, QueryError> {
        Ok(self.buffer.recent_transaction(hash).await?)
    }

    /// Returns the transaction with the given hash, merged with its receipt.
    pub async fn transaction(&self, hash: B256) -> Result<Option<Transaction>, QueryError> {
        match self.upstream.transaction(hash).await {
            Ok(tx) => Ok(Some(tx)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the persisted transactions touching `address`, newest first.
    pub async fn transactions_by_address(
        &self,
        address: Address,
    ) -> Result<Vec<TransactionRecord>, QueryError> {
        Ok(self.store.transactions_where_address(address).await?)
    }

    /// Returns the current metrics.
    pub fn metadata(&self) -> Metadata {
        self.metadata.snapshot()
    }

    /// Returns the number of transactions ingested so far.
    pub async fn trx_count(&self) -> Result<u64, QueryError> {
        Ok(self.store.trx_count().await?)
    }

    /// Returns the published transactions per bucket series.
    pub fn txs_ticks(&self) -> Vec<CountTick> {
        self.metadata.txs_ticks()
    }

    /// Returns the published gas used per bucket series.
    pub fn gas_ticks(&self) -> Vec<CountTick> {
        self.metadata.gas_ticks()
    }

    /// Computes the time-to-finality series ending at the current bucket.
    pub async fn ttf_ticks(&self) -> Result<Vec<FloatTick>, QueryError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        self.ttf_ticks_at(now).await
    }

    async fn ttf_ticks_at(&self, now: u64) -> Result<Vec<FloatTick>, QueryError> {
        let end = aggregation_bucket(now, AGGREGATION_RESOLUTION);
        Ok(self.store.ttf_aggregation(end, AGGREGATION_RESOLUTION, AGGREGATION_TICKS).await?)
    }

    /// Returns the latest balance of `address`.
    pub async fn balance(&self, address: Address) -> Result<U256, QueryError> {
        Ok(self.upstream.balance(address).await?)
    }

    /// Returns the pending nonce of `address`.
    pub async fn pending_nonce(&self, address: Address) -> Result<u64, QueryError> {
        Ok(self.upstream.pending_nonce(address).await?)
    }

    /// Returns the suggested gas price.
    pub async fn gas_price(&self) -> Result<u128, QueryError> {
        Ok(self.upstream.gas_price().await?)
    }

    /// Returns the upstream network id.
    pub async fn network_id(&self) -> Result<u64, QueryError> {
        Ok(self.upstream.network_id().await?)
    }

    /// Submits a signed transaction, returning its hash.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, QueryError> {
        Ok(self.upstream.send_raw_transaction(raw).await?)
    }

    /// Executes a read-only call against the latest state.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, QueryError> {
        Ok(self.upstream.call(to, data).await?)
    }
}
