//! Transaction types served by the explorer.

use alloy_primitives::{Address, B256, Bytes, U256};

/// The derived kind of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum TransactionKind {
    /// A plain value transfer without calldata.
    #[default]
    #[display("transfer")]
    Transfer,
    /// A call into an existing contract.
    #[display("contract_call")]
    ContractCall,
    /// A transaction without a recipient, deploying a contract.
    #[display("contract_creation")]
    ContractCreation,
}

impl TransactionKind {
    /// Derives the kind from the recipient and the calldata of a transaction.
    pub fn derive(to: Option<&Address>, input: &[u8]) -> Self {
        match to {
            None => Self::ContractCreation,
            Some(_) if input.is_empty() => Self::Transfer,
            Some(_) => Self::ContractCall,
        }
    }
}

/// A transaction merged with its receipt, if mined.
///
/// Receipt-derived fields (`gas_used`, `cumulative_gas_used`, `status`, `contract_address`) are
/// `None` while the transaction is pending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Transaction {
    /// The transaction hash.
    pub hash: B256,
    /// Hash of the including block, `None` when pending.
    pub block_hash: Option<B256>,
    /// Number of the including block, `None` when pending.
    pub block_number: Option<u64>,
    /// The sender.
    pub from: Address,
    /// The recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// The address of the contract created by this transaction.
    pub contract_address: Option<Address>,
    /// The sender nonce.
    pub nonce: u64,
    /// Gas offered by the sender.
    pub gas: u64,
    /// Gas used by the transaction.
    pub gas_used: Option<u64>,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: Option<u64>,
    /// The gas price.
    pub gas_price: u128,
    /// The transferred value.
    pub value: U256,
    /// The calldata.
    pub input: Bytes,
    /// Index of the transaction in its block.
    pub transaction_index: Option<u64>,
    /// Receipt status, `1` on success.
    pub status: Option<u64>,
    /// The derived transaction kind.
    pub kind: TransactionKind,
}

impl Transaction {
    /// Returns true if the transaction is not yet included in a block.
    pub const fn is_pending(&self) -> bool {
        self.block_hash.is_none()
    }

    /// Returns the distinct set of addresses touched by this transaction: the sender, the
    /// recipient and the created contract, if any.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses = Vec::with_capacity(3);
        for address in [Some(self.from), self.to, self.contract_address].into_iter().flatten() {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        addresses
    }
}

/// An entry of the latest-transactions view, derived from an ingested block without
/// fetching the transaction itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RecentTransaction {
    /// The transaction hash.
    pub hash: B256,
    /// The number of the including block.
    pub block_number: u64,
    /// The timestamp of the including block.
    pub timestamp: u64,
    /// Index of the transaction in its block.
    pub index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rstest::rstest;

    const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

    #[rstest]
    #[case(None, &[], TransactionKind::ContractCreation)]
    #[case(None, &[0x60, 0x80], TransactionKind::ContractCreation)]
    #[case(Some(BOB), &[], TransactionKind::Transfer)]
    #[case(Some(BOB), &[0xa9, 0x05, 0x9c, 0xbb], TransactionKind::ContractCall)]
    fn test_derive_kind(
        #[case] to: Option<Address>,
        #[case] input: &[u8],
        #[case] expected: TransactionKind,
    ) {
        assert_eq!(TransactionKind::derive(to.as_ref(), input), expected);
    }

    #[test]
    fn test_addresses_dedup() {
        let tx = Transaction { from: ALICE, to: Some(ALICE), ..Default::default() };
        assert_eq!(tx.addresses(), vec![ALICE]);

        let tx = Transaction {
            from: ALICE,
            to: None,
            contract_address: Some(BOB),
            ..Default::default()
        };
        assert_eq!(tx.addresses(), vec![ALICE, BOB]);
    }

    #[test]
    fn test_pending() {
        assert!(Transaction::default().is_pending());
        let mined = Transaction { block_hash: Some(B256::ZERO), ..Default::default() };
        assert!(!mined.is_pending());
    }
}
