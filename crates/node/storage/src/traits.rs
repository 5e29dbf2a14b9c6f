use crate::{BlockRecord, StorageError, TokensRequest, TransactionRecord};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use opera_protocol::{CountTick, FloatTick, TtfSample};
use std::fmt::Debug;

/// Provides an interface to persist per-block records.
///
/// Implementations are expected to provide thread-safe access. Callers bound every call with
/// their own timeout; dropping the returned future cancels the call.
#[async_trait]
pub trait BlockStorage: Debug + Send + Sync {
    /// Stores the record of an ingested block, replacing any record with the same number.
    async fn add_block(&self, record: BlockRecord) -> Result<(), StorageError>;

    /// Gets the record of the block with the given number.
    ///
    /// # Returns
    /// * `Ok(BlockRecord)` if the block is stored.
    /// * `Err(StorageError::EntryNotFound)` otherwise.
    async fn block(&self, number: u64) -> Result<BlockRecord, StorageError>;
}

/// Provides an interface to persist transactions and the running transaction counter.
#[async_trait]
pub trait TransactionStorage: Debug + Send + Sync {
    /// Stores a batch of transaction rows.
    async fn add_transactions(&self, batch: Vec<TransactionRecord>) -> Result<(), StorageError>;

    /// Returns the stored transactions touching `address`, newest first.
    async fn transactions_where_address(
        &self,
        address: Address,
    ) -> Result<Vec<TransactionRecord>, StorageError>;

    /// Adds `delta` to the persistent transaction counter.
    async fn increment_trx_count(&self, delta: u64) -> Result<(), StorageError>;

    /// Returns the persistent transaction counter.
    async fn trx_count(&self) -> Result<u64, StorageError>;

    /// Drops the oldest transactions so that at most `max_count` remain.
    ///
    /// Returns the number of removed rows.
    async fn shrink_transactions(&self, max_count: usize) -> Result<usize, StorageError>;
}

/// Provides an interface to persist time-to-finality samples.
#[async_trait]
pub trait TtfStorage: Debug + Send + Sync {
    /// Stores a time-to-finality sample.
    async fn add_ttf_sample(&self, sample: TtfSample) -> Result<(), StorageError>;

    /// Drops the oldest samples so that at most `max_count` remain.
    ///
    /// Returns the number of removed samples.
    async fn shrink_ttf(&self, max_count: usize) -> Result<usize, StorageError>;
}

/// Provides the time-bucketed aggregations over the stored records.
///
/// Every aggregation returns exactly `ticks` entries whose timestamps step by `resolution` and
/// end at `end`. See [`crate::aggregation`].
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait AggregationStorage: Debug + Send + Sync {
    /// Sums the transaction counts of the stored blocks.
    async fn txs_aggregation(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
    ) -> Result<Vec<CountTick>, StorageError>;

    /// Sums the gas used by the stored blocks.
    async fn gas_aggregation(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
    ) -> Result<Vec<CountTick>, StorageError>;

    /// Averages the stored time-to-finality samples.
    async fn ttf_aggregation(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
    ) -> Result<Vec<FloatTick>, StorageError>;
}

/// Provides an interface to persist faucet tokens requests.
#[async_trait]
pub trait TokensRequestStorage: Debug + Send + Sync {
    /// Stores a new tokens request.
    ///
    /// Fails with [`StorageError::ConflictError`] if a request with the same id exists.
    async fn add_tokens_request(&self, request: TokensRequest) -> Result<(), StorageError>;

    /// Replaces a stored tokens request.
    async fn update_tokens_request(&self, request: TokensRequest) -> Result<(), StorageError>;

    /// Returns the newest unclaimed request of `receiver`, if any.
    async fn latest_unclaimed_tokens_request(
        &self,
        receiver: Address,
    ) -> Result<Option<TokensRequest>, StorageError>;

    /// Returns claimed requests coming from `ip_address` or sent to `receiver`, created at or
    /// after `since`, newest first.
    async fn latest_claimed_tokens_requests(
        &self,
        receiver: Address,
        ip_address: &str,
        since: u64,
    ) -> Result<Vec<TokensRequest>, StorageError>;

    /// Returns the request with the given id.
    async fn tokens_request(&self, id: B256) -> Result<TokensRequest, StorageError>;
}

/// The complete explorer store.
pub trait ExplorerStore:
    BlockStorage + TransactionStorage + TtfStorage + AggregationStorage + TokensRequestStorage
{
}

impl<T> ExplorerStore for T where
    T: BlockStorage + TransactionStorage + TtfStorage + AggregationStorage + TokensRequestStorage
{
}
