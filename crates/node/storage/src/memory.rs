//! Contains the [`InMemoryStore`].

use crate::{
    AggregationStorage, BlockRecord, BlockStorage, StorageError, TokensRequest,
    TokensRequestStorage, TransactionRecord, TransactionStorage, TtfStorage,
    aggregation::{average_series, sum_series},
};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use opera_protocol::{CountTick, FloatTick, TtfSample};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Default number of block records retained by the [`InMemoryStore`].
pub const DEFAULT_MAX_BLOCKS: usize = 100_000;

#[derive(Debug, Default)]
struct Inner {
    blocks: BTreeMap<u64, BlockRecord>,
    /// Transaction rows, oldest first.
    transactions: VecDeque<TransactionRecord>,
    trx_count: u64,
    /// Time-to-finality samples, oldest first.
    ttf: VecDeque<TtfSample>,
    tokens_requests: Vec<TokensRequest>,
}

/// An explorer store kept in process memory.
///
/// Block records are bounded by `max_blocks`; transactions and time-to-finality samples are
/// bounded by the shrink calls of the caller.
#[derive(Debug)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    max_blocks: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BLOCKS)
    }
}

impl InMemoryStore {
    /// Creates an empty [`InMemoryStore`] retaining at most `max_blocks` block records.
    pub fn new(max_blocks: usize) -> Self {
        Self { inner: RwLock::new(Inner::default()), max_blocks: max_blocks.max(1) }
    }

    /// Returns the number of stored block records.
    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }

    /// Returns the number of stored transaction rows.
    pub fn transaction_count(&self) -> usize {
        self.inner.read().transactions.len()
    }

    /// Returns the number of stored time-to-finality samples.
    pub fn ttf_count(&self) -> usize {
        self.inner.read().ttf.len()
    }

    /// Collects `(timestamp, value)` pairs of the block records inside the aggregation window.
    fn block_samples(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
        value: impl Fn(&BlockRecord) -> u64,
    ) -> Vec<(u64, u64)> {
        let start = end.saturating_sub(resolution.saturating_mul(ticks as u64));
        let inner = self.inner.read();
        inner
            .blocks
            .values()
            .rev()
            .filter(|record| record.timestamp <= end)
            .take_while(|record| record.timestamp > start)
            .map(|record| (record.timestamp, value(record)))
            .collect()
    }
}

#[async_trait]
impl BlockStorage for InMemoryStore {
    async fn add_block(&self, record: BlockRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.blocks.insert(record.number, record);
        while inner.blocks.len() > self.max_blocks {
            inner.blocks.pop_first();
        }
        Ok(())
    }

    async fn block(&self, number: u64) -> Result<BlockRecord, StorageError> {
        self.inner
            .read()
            .blocks
            .get(&number)
            .copied()
            .ok_or_else(|| StorageError::EntryNotFound(format!("block {number}")))
    }
}

#[async_trait]
impl TransactionStorage for InMemoryStore {
    async fn add_transactions(&self, batch: Vec<TransactionRecord>) -> Result<(), StorageError> {
        self.inner.write().transactions.extend(batch);
        Ok(())
    }

    async fn transactions_where_address(
        &self,
        address: Address,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        Ok(self
            .inner
            .read()
            .transactions
            .iter()
            .rev()
            .filter(|record| record.addresses.contains(&address))
            .cloned()
            .collect())
    }

    async fn increment_trx_count(&self, delta: u64) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.trx_count = inner.trx_count.saturating_add(delta);
        Ok(())
    }

    async fn trx_count(&self) -> Result<u64, StorageError> {
        Ok(self.inner.read().trx_count)
    }

    async fn shrink_transactions(&self, max_count: usize) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let excess = inner.transactions.len().saturating_sub(max_count);
        inner.transactions.drain(..excess).for_each(drop);
        if excess > 0 {
            debug!(target: "storage", removed = excess, max_count, "Shrank transactions");
        }
        Ok(excess)
    }
}

#[async_trait]
impl TtfStorage for InMemoryStore {
    async fn add_ttf_sample(&self, sample: TtfSample) -> Result<(), StorageError> {
        self.inner.write().ttf.push_back(sample);
        Ok(())
    }

    async fn shrink_ttf(&self, max_count: usize) -> Result<usize, StorageError> {
        let mut inner = self.inner.write();
        let excess = inner.ttf.len().saturating_sub(max_count);
        inner.ttf.drain(..excess).for_each(drop);
        Ok(excess)
    }
}

#[async_trait]
impl AggregationStorage for InMemoryStore {
    async fn txs_aggregation(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
    ) -> Result<Vec<CountTick>, StorageError> {
        let samples = self.block_samples(end, resolution, ticks, |record| record.txs_count);
        Ok(sum_series(samples, end, resolution, ticks))
    }

    async fn gas_aggregation(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
    ) -> Result<Vec<CountTick>, StorageError> {
        let samples = self.block_samples(end, resolution, ticks, |record| record.gas_used);
        Ok(sum_series(samples, end, resolution, ticks))
    }

    async fn ttf_aggregation(
        &self,
        end: u64,
        resolution: u64,
        ticks: usize,
    ) -> Result<Vec<FloatTick>, StorageError> {
        let samples: Vec<_> =
            self.inner.read().ttf.iter().map(|sample| (sample.timestamp, sample.value)).collect();
        Ok(average_series(samples, end, resolution, ticks))
    }
}

#[async_trait]
impl TokensRequestStorage for InMemoryStore {
    async fn add_tokens_request(&self, request: TokensRequest) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        if inner.tokens_requests.iter().any(|r| r.id == request.id) {
            return Err(StorageError::ConflictError(format!("tokens request {}", request.id)));
        }
        inner.tokens_requests.push(request);
        Ok(())
    }

    async fn update_tokens_request(&self, request: TokensRequest) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        let stored = inner
            .tokens_requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| StorageError::EntryNotFound(format!("tokens request {}", request.id)))?;
        *stored = request;
        Ok(())
    }

    async fn latest_unclaimed_tokens_request(
        &self,
        receiver: Address,
    ) -> Result<Option<TokensRequest>, StorageError> {
        Ok(self
            .inner
            .read()
            .tokens_requests
            .iter()
            .filter(|r| r.receiver == receiver && !r.is_claimed())
            .max_by_key(|r| r.created)
            .cloned())
    }

    async fn latest_claimed_tokens_requests(
        &self,
        receiver: Address,
        ip_address: &str,
        since: u64,
    ) -> Result<Vec<TokensRequest>, StorageError> {
        let mut requests: Vec<_> = self
            .inner
            .read()
            .tokens_requests
            .iter()
            .filter(|r| r.is_claimed() && r.created >= since)
            .filter(|r| r.receiver == receiver || r.ip_address == ip_address)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(requests)
    }

    async fn tokens_request(&self, id: B256) -> Result<TokensRequest, StorageError> {
        self.inner
            .read()
            .tokens_requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StorageError::EntryNotFound(format!("tokens request {id}")))
    }
}
