//! Records persisted by the explorer store.

use alloy_primitives::{Address, B256};
use derive_more::Constructor;
use opera_protocol::Block;
use serde::{Deserialize, Serialize};

/// Per-block record feeding the transaction count and gas aggregations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Constructor, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    /// The block number.
    pub number: u64,
    /// The block timestamp, in unix seconds.
    pub timestamp: u64,
    /// Number of transactions in the block.
    pub txs_count: u64,
    /// Gas used by the block.
    pub gas_used: u64,
}

impl From<&Block> for BlockRecord {
    fn from(block: &Block) -> Self {
        Self {
            number: block.number,
            timestamp: block.timestamp,
            txs_count: block.transaction_count() as u64,
            gas_used: block.gas_used,
        }
    }
}

/// A transaction row, indexed by every address it touches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Constructor, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// The transaction hash.
    pub hash: B256,
    /// The number of the including block.
    pub block_number: u64,
    /// The timestamp of the including block.
    pub timestamp: u64,
    /// Sender, recipient and created contract, without duplicates.
    pub addresses: Vec<Address>,
}

/// A faucet tokens request, as tracked by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokensRequest {
    /// Unique request identifier.
    pub id: B256,
    /// The address receiving the tokens.
    pub receiver: Address,
    /// The IP address the request came from.
    pub ip_address: String,
    /// When the request was created, in unix seconds.
    pub created: u64,
    /// When the tokens were claimed, if they were.
    pub claimed: Option<u64>,
    /// The hash of the transaction sending the tokens.
    pub claim_tx: Option<B256>,
}

impl TokensRequest {
    /// Returns true once the tokens have been sent.
    pub const fn is_claimed(&self) -> bool {
        self.claimed.is_some()
    }
}
