//! JSON-RPC response shapes of the Opera node.
//!
//! Opera blocks carry an `epoch` field the standard Ethereum types drop, so blocks,
//! transactions and receipts are decoded into these narrow shapes and converted into the
//! protocol types.

use alloy_primitives::{Address, B256, Bytes, U256};
use opera_protocol::{Block, Transaction, TransactionKind};
use serde::Deserialize;

/// A block as returned by `eth_getBlockByNumber` with transaction hashes only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireBlock {
    #[serde(with = "alloy_serde::quantity")]
    number: u64,
    hash: B256,
    parent_hash: B256,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    epoch: Option<u64>,
    #[serde(with = "alloy_serde::quantity")]
    timestamp: u64,
    #[serde(with = "alloy_serde::quantity")]
    gas_used: u64,
    #[serde(default)]
    transactions: Vec<B256>,
}

impl From<WireBlock> for Block {
    fn from(block: WireBlock) -> Self {
        Self {
            number: block.number,
            hash: block.hash,
            parent_hash: block.parent_hash,
            epoch: block.epoch.unwrap_or_default(),
            timestamp: block.timestamp,
            gas_used: block.gas_used,
            transactions: block.transactions,
        }
    }
}

/// A transaction as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTransaction {
    hash: B256,
    block_hash: Option<B256>,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    block_number: Option<u64>,
    from: Address,
    to: Option<Address>,
    #[serde(with = "alloy_serde::quantity")]
    nonce: u64,
    #[serde(with = "alloy_serde::quantity")]
    gas: u64,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    gas_price: Option<u128>,
    value: U256,
    input: Bytes,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    transaction_index: Option<u64>,
}

/// A receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireReceipt {
    #[serde(with = "alloy_serde::quantity")]
    gas_used: u64,
    #[serde(with = "alloy_serde::quantity")]
    cumulative_gas_used: u64,
    contract_address: Option<Address>,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    status: Option<u64>,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    effective_gas_price: Option<u128>,
}

impl WireTransaction {
    /// Merges the transaction with its receipt. A missing receipt leaves the
    /// receipt-derived fields unset.
    pub(crate) fn merge(self, receipt: Option<WireReceipt>) -> Transaction {
        let kind = TransactionKind::derive(self.to.as_ref(), &self.input);
        let mut tx = Transaction {
            hash: self.hash,
            block_hash: self.block_hash,
            block_number: self.block_number,
            from: self.from,
            to: self.to,
            nonce: self.nonce,
            gas: self.gas,
            gas_price: self.gas_price.unwrap_or_default(),
            value: self.value,
            input: self.input,
            transaction_index: self.transaction_index,
            kind,
            ..Default::default()
        };
        if let Some(receipt) = receipt {
            tx.gas_used = Some(receipt.gas_used);
            tx.cumulative_gas_used = Some(receipt.cumulative_gas_used);
            tx.contract_address = receipt.contract_address;
            tx.status = receipt.status;
            if let Some(price) = receipt.effective_gas_price {
                tx.gas_price = price;
            }
        }
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};
    use serde_json::json;

    #[test]
    fn test_decode_opera_block() {
        let raw = json!({
            "number": "0x3e8",
            "hash": "0x00000000000003e83fddf1e9330f0a8691d9f0b2af57b38c3bb85488488a40df",
            "parentHash": "0x00000000000003e7e8b5c8b2d3b8fa3a1f0d0a02a0d11f2b6c1d40c2ab1f3e01",
            "epoch": "0x2a",
            "timestamp": "0x5f5e100",
            "gasUsed": "0x5208",
            "miner": "0x0000000000000000000000000000000000000000",
            "transactions": [
                "0x1111111111111111111111111111111111111111111111111111111111111111"
            ]
        });
        let block: Block = serde_json::from_value::<WireBlock>(raw).unwrap().into();
        assert_eq!(block.number, 1000);
        assert_eq!(block.epoch, 42);
        assert_eq!(block.timestamp, 100_000_000);
        assert_eq!(block.gas_used, 21_000);
        assert_eq!(
            block.transactions,
            vec![b256!("0x1111111111111111111111111111111111111111111111111111111111111111")]
        );
    }

    #[test]
    fn test_decode_block_without_epoch() {
        let raw = json!({
            "number": "0x1",
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "timestamp": "0x1",
            "gasUsed": "0x0"
        });
        let block: Block = serde_json::from_value::<WireBlock>(raw).unwrap().into();
        assert_eq!(block.epoch, 0);
        assert!(block.transactions.is_empty());
    }

    fn wire_tx(to: Option<Address>, input: &str) -> WireTransaction {
        serde_json::from_value(json!({
            "hash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "blockHash": "0x3333333333333333333333333333333333333333333333333333333333333333",
            "blockNumber": "0x10",
            "from": "0x00000000000000000000000000000000000a11ce",
            "to": to,
            "nonce": "0x7",
            "gas": "0x5208",
            "gasPrice": "0x3b9aca00",
            "value": "0xde0b6b3a7640000",
            "input": input,
            "transactionIndex": "0x0"
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_receipt() {
        let receipt: WireReceipt = serde_json::from_value(json!({
            "gasUsed": "0x5208",
            "cumulativeGasUsed": "0xa410",
            "contractAddress": null,
            "status": "0x1",
            "effectiveGasPrice": "0x77359400"
        }))
        .unwrap();
        let bob = address!("0x0000000000000000000000000000000000000b0b");
        let tx = wire_tx(Some(bob), "0x").merge(Some(receipt));

        assert_eq!(tx.block_number, Some(16));
        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.gas_used, Some(21_000));
        assert_eq!(tx.cumulative_gas_used, Some(42_000));
        assert_eq!(tx.status, Some(1));
        assert_eq!(tx.gas_price, 2_000_000_000);
        assert_eq!(tx.value, U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(tx.kind, TransactionKind::Transfer);
    }

    #[test]
    fn test_merge_without_receipt() {
        let tx = wire_tx(None, "0x6080").merge(None);
        assert_eq!(tx.kind, TransactionKind::ContractCreation);
        assert_eq!(tx.gas_price, 1_000_000_000);
        assert!(tx.gas_used.is_none());
        assert!(tx.status.is_none());
    }
}
