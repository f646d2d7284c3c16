//! Chain Block Model - Receipt-enriched Blocks and Transactions
//!
//! Defines the block shape emitted by the confirmation-gated block source.
//! Unlike raw RPC blocks, transactions here already carry their receipt
//! fields (gas used, execution status, deployed contract address), so
//! consumers never issue follow-up receipt lookups.

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::Log;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of a mined transaction, recovered from its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Execution reverted or ran out of gas.
    Failed,
    /// Execution succeeded.
    Successful,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Successful => write!(f, "successful"),
        }
    }
}

/// A mined transaction together with the receipt fields merged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTransaction {
    /// Number of the block this transaction was mined in.
    pub block_number: u64,
    /// Sender recovered by the node.
    pub from: Address,
    /// Recipient. `None` means contract creation.
    pub to: Option<Address>,
    /// Transaction hash.
    pub hash: B256,
    /// Calldata.
    pub input: Bytes,
    /// Sender's sequence number.
    pub nonce: u64,
    /// Position within the block.
    pub transaction_index: u64,
    /// Transferred value in wei.
    pub value: U256,
    /// Gas limit the sender attached.
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    /// Gas actually consumed (from the receipt).
    pub gas_used: Option<u64>,
    /// Address of the deployed contract, for creation transactions.
    pub contract_address: Option<Address>,
    /// Execution status (from the receipt). `None` on pre-Byzantium chains.
    pub status: Option<TransactionStatus>,
    /// Logs emitted during execution.
    pub logs: Vec<Log>,
}

impl BlockTransaction {
    /// Whether this transaction deployed a contract.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// A finalized block as delivered by the block source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Block height.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Address of the miner / fee recipient.
    pub miner: Address,
    /// Total difficulty target (zero on post-merge chains).
    pub difficulty: U256,
    /// Arbitrary extra data set by the block producer.
    pub extra_data: Bytes,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Gas consumed by all transactions in the block.
    pub gas_used: u64,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
    /// Transactions with receipt fields merged in.
    pub transactions: Vec<BlockTransaction>,
}

impl Block {
    /// Number of transactions in the block.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx(to: Option<Address>) -> BlockTransaction {
        BlockTransaction {
            block_number: 7,
            from: Address::ZERO,
            to,
            hash: B256::ZERO,
            input: Bytes::new(),
            nonce: 0,
            transaction_index: 0,
            value: U256::ZERO,
            gas_limit: 21_000,
            gas_price: 1_000_000_000,
            gas_used: Some(21_000),
            contract_address: None,
            status: Some(TransactionStatus::Successful),
            logs: vec![],
        }
    }

    #[test]
    fn test_contract_creation_detection() {
        assert!(sample_tx(None).is_contract_creation());
        assert!(!sample_tx(Some(Address::ZERO)).is_contract_creation());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", TransactionStatus::Successful), "successful");
        assert_eq!(format!("{}", TransactionStatus::Failed), "failed");
    }

    #[test]
    fn test_block_transaction_count() {
        let block = Block {
            number: 7,
            hash: B256::ZERO,
            miner: Address::ZERO,
            difficulty: U256::ZERO,
            extra_data: Bytes::new(),
            gas_limit: 30_000_000,
            gas_used: 21_000,
            timestamp: Utc::now(),
            transactions: vec![sample_tx(None)],
        };
        assert_eq!(block.transaction_count(), 1);
    }
}
