//! Contains the [`Block`] type.

use alloy_primitives::B256;

/// A mined block, as observed from the upstream node.
///
/// Blocks are immutable once fetched. Only the transaction hashes are carried; full
/// transactions are fetched on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_more::Display)]
#[display("Block {{ number: {number}, hash: {hash}, txs: {} }}", transactions.len())]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Block {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
    /// The parent block hash.
    pub parent_hash: B256,
    /// The epoch the block was produced in.
    pub epoch: u64,
    /// The block timestamp, in unix seconds.
    pub timestamp: u64,
    /// The total gas used by the block.
    pub gas_used: u64,
    /// The ordered transaction hashes of the block.
    pub transactions: Vec<B256>,
}

impl Block {
    /// Returns the number of transactions included in the block.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Returns true if the block is the zero-block sentinel the upstream node returns for
    /// unknown heights.
    pub fn is_zero_sentinel(&self) -> bool {
        self.number == 0 && self.hash.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn test_zero_sentinel() {
        assert!(Block::default().is_zero_sentinel());

        let genesis = Block {
            hash: b256!("0x00000000000003e83fddf1e9330f0a8691d9f0b2af57b38c3bb85488488a40df"),
            ..Default::default()
        };
        assert!(!genesis.is_zero_sentinel());

        let block = Block { number: 7, ..Default::default() };
        assert!(!block.is_zero_sentinel());
    }

    #[test]
    fn test_block_display() {
        let block =
            Block { number: 12, transactions: vec![B256::ZERO, B256::ZERO], ..Default::default() };
        assert_eq!(
            block.to_string(),
            format!("Block {{ number: 12, hash: {}, txs: 2 }}", B256::ZERO)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_block_serde_camel_case() {
        let block = Block { number: 1, gas_used: 21_000, ..Default::default() };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["gasUsed"], 21_000);
        assert!(json.get("parentHash").is_some());
    }
}
