//! RPC Block Reader - Receipt-enriched Block Retrieval
//!
//! Implements [`ChainReader`] over the shared provider. A block fetch is
//! one `eth_getBlockByNumber` with full transactions, followed by the
//! receipts of every transaction retrieved as grouped batch requests so
//! individual round trips stay bounded in size. An empty block response
//! maps to [`ReadError::NotFound`], which the block source relies on to
//! tell "not produced yet" apart from a failing node.

use std::sync::Arc;

use alloy::consensus::Transaction as _;
use alloy::primitives::B256;
use alloy::providers::Provider;
use alloy::rpc::client::BatchRequest;
use alloy::rpc::types::TransactionReceipt;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::provider::RpcProvider;
use crate::domain::{Block, BlockTransaction, TransactionStatus};
use crate::ports::{ChainReader, ReadError};

/// Receipts fetched per batch round trip.
const RECEIPT_CHUNK_SIZE: usize = 500;

/// [`ChainReader`] implementation with receipt enrichment.
pub struct RpcBlockReader {
    provider: Arc<dyn Provider + Send + Sync>,
}

impl RpcBlockReader {
    /// Create a reader sharing the given provider connection.
    pub fn new(provider: &RpcProvider) -> Self {
        Self {
            provider: provider.inner(),
        }
    }

    /// Fetch receipts for the given hashes, in order, in chunks of
    /// [`RECEIPT_CHUNK_SIZE`] per batch request.
    ///
    /// A null receipt for a mined transaction is a node inconsistency
    /// and fails the whole block fetch.
    async fn fetch_receipts(&self, hashes: &[B256]) -> anyhow::Result<Vec<TransactionReceipt>> {
        let mut receipts = Vec::with_capacity(hashes.len());
        let client = self.provider.client();

        for (chunk_index, chunk) in hashes.chunks(RECEIPT_CHUNK_SIZE).enumerate() {
            let mut batch = BatchRequest::new(&client);
            let mut waiters = Vec::with_capacity(chunk.len());

            for hash in chunk {
                let waiter = batch
                    .add_call::<_, Option<TransactionReceipt>>(
                        "eth_getTransactionReceipt",
                        &(*hash,),
                    )
                    .with_context(|| format!("batching receipt request for {hash}"))?;
                waiters.push((*hash, waiter));
            }

            batch
                .send()
                .await
                .with_context(|| format!("receipt batch {chunk_index} failed"))?;

            for (hash, waiter) in waiters {
                let receipt = waiter
                    .await
                    .with_context(|| format!("receipt request failed for {hash}"))?
                    .with_context(|| format!("got null receipt for mined transaction {hash}"))?;
                receipts.push(receipt);
            }
        }

        Ok(receipts)
    }

    /// Convert an RPC block into the domain model, merging receipts in.
    async fn enrich(&self, rpc_block: alloy::rpc::types::Block) -> anyhow::Result<Block> {
        let header = &rpc_block.header;

        let number = header.number;
        let hash = header.hash;
        let miner = header.beneficiary;
        let difficulty = header.difficulty;
        let extra_data = header.extra_data.clone();
        let gas_limit = header.gas_limit;
        let gas_used = header.gas_used;
        let timestamp = DateTime::<Utc>::from_timestamp(header.timestamp as i64, 0)
            .unwrap_or_default();

        let txs: Vec<alloy::rpc::types::Transaction> =
            rpc_block.transactions.into_transactions().collect();
        let hashes: Vec<B256> = txs.iter().map(|tx| *tx.inner.tx_hash()).collect();
        let receipts = self.fetch_receipts(&hashes).await?;

        let transactions = txs
            .into_iter()
            .zip(receipts)
            .map(|(tx, receipt)| {
                let status = if receipt.status() {
                    TransactionStatus::Successful
                } else {
                    TransactionStatus::Failed
                };

                BlockTransaction {
                    block_number: tx.block_number.unwrap_or(number),
                    from: tx.from,
                    to: tx.inner.to(),
                    hash: *tx.inner.tx_hash(),
                    input: tx.inner.input().clone(),
                    nonce: tx.inner.nonce(),
                    transaction_index: tx.transaction_index.unwrap_or_default(),
                    value: tx.inner.value(),
                    gas_limit: tx.inner.gas_limit(),
                    gas_price: tx
                        .effective_gas_price
                        .unwrap_or_else(|| tx.inner.max_fee_per_gas()),
                    gas_used: Some(receipt.gas_used as u64),
                    contract_address: receipt.contract_address,
                    status: Some(status),
                    logs: receipt.inner.logs().to_vec(),
                }
            })
            .collect();

        Ok(Block {
            number,
            hash,
            miner,
            difficulty,
            extra_data,
            gas_limit,
            gas_used,
            timestamp,
            transactions,
        })
    }
}

fn block_number_param(number: Option<u64>) -> String {
    number.map_or_else(|| "latest".to_string(), |n| format!("0x{n:x}"))
}

#[async_trait]
impl ChainReader for RpcBlockReader {
    async fn head_number(&self) -> Result<u64, ReadError> {
        self.provider
            .get_block_number()
            .await
            .context("eth_blockNumber")
            .map_err(ReadError::Other)
    }

    async fn block_by_number(&self, number: Option<u64>) -> Result<Block, ReadError> {
        // Raw request: keeps the full-transaction form and lets a null
        // response map cleanly to the not-found condition.
        let raw: Option<alloy::rpc::types::Block> = self
            .provider
            .client()
            .request("eth_getBlockByNumber", (block_number_param(number), true))
            .await
            .context("eth_getBlockByNumber")
            .map_err(ReadError::Other)?;

        let rpc_block = raw.ok_or(ReadError::NotFound)?;

        self.enrich(rpc_block).await.map_err(ReadError::Other)
    }
}
