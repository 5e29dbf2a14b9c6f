//! The upstream client and its alloy backed implementation.

use crate::{
    HeadFeed, HeadReceiver, HeadSource, HeadSubscription, UpstreamError,
    wire::{WireBlock, WireReceipt, WireTransaction},
};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use alloy_transport::TransportResult;
use async_trait::async_trait;
use futures::StreamExt;
use opera_protocol::{Block, Transaction};
use std::{fmt::Debug, future::IntoFuture, sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use url::Url;

/// The default bound on every upstream call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// The explorer's view of the upstream node.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait UpstreamClient: Debug + Send + Sync {
    /// Fetches the block at the given height, with transaction hashes only.
    async fn block_by_number(&self, number: u64) -> Result<Block, UpstreamError>;

    /// Fetches a transaction merged with its receipt, if it was mined.
    async fn transaction(&self, hash: B256) -> Result<Transaction, UpstreamError>;

    /// Returns the latest block number.
    async fn block_number(&self) -> Result<u64, UpstreamError>;

    /// Returns the latest balance of the given account.
    async fn balance(&self, address: Address) -> Result<U256, UpstreamError>;

    /// Returns the pending nonce of the given account.
    async fn pending_nonce(&self, address: Address) -> Result<u64, UpstreamError>;

    /// Returns the suggested gas price.
    async fn gas_price(&self) -> Result<u128, UpstreamError>;

    /// Returns the network id of the node.
    async fn network_id(&self) -> Result<u64, UpstreamError>;

    /// Submits a signed transaction and returns its hash.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, UpstreamError>;

    /// Executes a read-only call against the latest state.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, UpstreamError>;

    /// Returns the head receiver, starting the head feed on first use.
    fn subscribe_heads(&self) -> HeadReceiver;

    /// Stops the head feed.
    fn close(&self);
}

/// An [`UpstreamClient`] backed by an alloy [`RootProvider`].
///
/// HTTP endpoints poll for new heads, websocket and IPC endpoints subscribe.
#[derive(Debug, Clone)]
pub struct AlloyUpstream {
    provider: RootProvider,
    timeout: Duration,
    head_feed: Arc<HeadFeed>,
}

impl AlloyUpstream {
    /// Creates a new [`AlloyUpstream`] over an existing provider.
    pub fn new(provider: RootProvider, timeout: Duration) -> Self {
        let source = AlloyHeadSource { provider: provider.clone(), timeout };
        let head_feed = Arc::new(HeadFeed::new(Arc::new(source)));
        Self { provider, timeout, head_feed }
    }

    /// Creates a new [`AlloyUpstream`] over plain HTTP.
    pub fn new_http(url: Url, timeout: Duration) -> Self {
        Self::new(RootProvider::new_http(url), timeout)
    }

    /// Connects to the given endpoint, picking the transport from the url scheme.
    pub async fn connect(url: &Url, timeout: Duration) -> Result<Self, UpstreamError> {
        let provider = tokio::time::timeout(timeout, RootProvider::connect(url.as_str()))
            .await
            .map_err(|_| UpstreamError::Timeout(timeout))??;
        Ok(Self::new(provider, timeout))
    }

    /// Returns the inner provider.
    pub const fn provider(&self) -> &RootProvider {
        &self.provider
    }

    async fn request<F, T>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        bounded(self.timeout, call).await
    }
}

async fn bounded<F, T>(timeout: Duration, call: F) -> Result<T, UpstreamError>
where
    F: IntoFuture<Output = TransportResult<T>>,
{
    tokio::time::timeout(timeout, call.into_future())
        .await
        .map_err(|_| UpstreamError::Timeout(timeout))?
        .map_err(Into::into)
}

#[async_trait]
impl UpstreamClient for AlloyUpstream {
    async fn block_by_number(&self, number: u64) -> Result<Block, UpstreamError> {
        let block: Option<WireBlock> = self
            .request(self.provider.raw_request(
                "eth_getBlockByNumber".into(),
                (BlockNumberOrTag::Number(number), false),
            ))
            .await?;
        let block: Block = block.ok_or(UpstreamError::BlockNotFound(number))?.into();

        // Some nodes answer unknown heights with an all-zero block.
        if block.is_zero_sentinel() {
            return Err(UpstreamError::BlockNotFound(number));
        }
        Ok(block)
    }

    async fn transaction(&self, hash: B256) -> Result<Transaction, UpstreamError> {
        let tx: Option<WireTransaction> = self
            .request(self.provider.raw_request("eth_getTransactionByHash".into(), (hash,)))
            .await?;
        let tx = tx.ok_or(UpstreamError::TransactionNotFound(hash))?;

        let receipt: Option<WireReceipt> = self
            .request(self.provider.raw_request("eth_getTransactionReceipt".into(), (hash,)))
            .await?;
        Ok(tx.merge(receipt))
    }

    async fn block_number(&self) -> Result<u64, UpstreamError> {
        self.request(self.provider.get_block_number()).await
    }

    async fn balance(&self, address: Address) -> Result<U256, UpstreamError> {
        self.request(self.provider.get_balance(address)).await
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, UpstreamError> {
        self.request(self.provider.get_transaction_count(address).pending()).await
    }

    async fn gas_price(&self) -> Result<u128, UpstreamError> {
        self.request(self.provider.get_gas_price()).await
    }

    async fn network_id(&self) -> Result<u64, UpstreamError> {
        self.request(self.provider.get_net_version()).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, UpstreamError> {
        let pending = self.request(self.provider.send_raw_transaction(&raw)).await?;
        Ok(*pending.tx_hash())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, UpstreamError> {
        let request = TransactionRequest::default().to(to).input(TransactionInput::new(data));
        self.request(self.provider.call(request)).await
    }

    fn subscribe_heads(&self) -> HeadReceiver {
        self.head_feed.subscribe()
    }

    fn close(&self) {
        self.head_feed.close();
    }
}

/// The [`HeadSource`] of an [`AlloyUpstream`].
#[derive(Debug)]
struct AlloyHeadSource {
    provider: RootProvider,
    timeout: Duration,
}

#[async_trait]
impl HeadSource for AlloyHeadSource {
    async fn subscribe_new_heads(&self) -> Result<HeadSubscription, UpstreamError> {
        let mut subscription = bounded(self.timeout, self.provider.subscribe_blocks()).await?;
        let id = *subscription.local_id();

        let heads = async_stream::stream! {
            loop {
                match subscription.recv().await {
                    Ok(header) => yield header.number,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "upstream", skipped, "Head subscription lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };
        Ok(HeadSubscription::new(Some(id), heads.boxed()))
    }

    async fn latest_block_number(&self) -> Result<u64, UpstreamError> {
        bounded(self.timeout, self.provider.get_block_number()).await
    }

    async fn unsubscribe(&self, id: B256) -> Result<(), UpstreamError> {
        self.provider.unsubscribe(id).map_err(Into::into)
    }
}
