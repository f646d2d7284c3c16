//! RPC Backend - ChainBackend over the Shared alloy Provider
//!
//! Maps the [`ChainBackend`] capability surface onto alloy provider
//! calls. Pure request/response: every node error propagates to the
//! caller with context attached, nothing is retried here. Log
//! subscription is bridged from alloy's filter poller into a broadcast
//! channel, so the port works over plain HTTP transports.

use std::sync::Arc;

use alloy::consensus::TxEnvelope;
use alloy::eips::BlockId;
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log, Transaction, TransactionReceipt, TransactionRequest};
use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;

use super::provider::RpcProvider;
use crate::ports::ChainBackend;

/// Capacity of the broadcast channel behind a log subscription.
const LOG_CHANNEL_CAPACITY: usize = 1024;

/// [`ChainBackend`] implementation over the shared RPC provider.
pub struct RpcBackend {
    provider: Arc<dyn Provider + Send + Sync>,
}

impl RpcBackend {
    /// Create a backend sharing the given provider connection.
    pub fn new(provider: &RpcProvider) -> Self {
        Self {
            provider: provider.inner(),
        }
    }
}

fn block_id(block: Option<u64>) -> BlockId {
    block.map_or_else(BlockId::latest, BlockId::number)
}

#[async_trait]
impl ChainBackend for RpcBackend {
    async fn code_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<Bytes> {
        self.provider
            .get_code_at(address)
            .block_id(block_id(block))
            .await
            .context("eth_getCode")
    }

    async fn call_contract(
        &self,
        request: &TransactionRequest,
        block: Option<u64>,
    ) -> anyhow::Result<Bytes> {
        let mut call = self.provider.call(request);
        if let Some(number) = block {
            call = call.block(BlockId::number(number));
        }
        call.await.context("eth_call")
    }

    async fn pending_code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        self.provider
            .get_code_at(address)
            .pending()
            .await
            .context("eth_getCode (pending)")
    }

    async fn pending_nonce_at(&self, account: Address) -> anyhow::Result<u64> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .context("eth_getTransactionCount (pending)")
    }

    async fn suggest_gas_price(&self) -> anyhow::Result<u128> {
        self.provider.get_gas_price().await.context("eth_gasPrice")
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> anyhow::Result<u64> {
        self.provider
            .estimate_gas(request)
            .await
            .context("eth_estimateGas")
    }

    async fn send_transaction(&self, tx: &TxEnvelope) -> anyhow::Result<()> {
        let encoded = tx.encoded_2718();
        self.provider
            .send_raw_transaction(&encoded)
            .await
            .context("eth_sendRawTransaction")?;
        Ok(())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> anyhow::Result<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .context("eth_getTransactionReceipt")
    }

    async fn balance_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<U256> {
        self.provider
            .get_balance(address)
            .block_id(block_id(block))
            .await
            .context("eth_getBalance")
    }

    async fn filter_logs(&self, filter: &Filter) -> anyhow::Result<Vec<Log>> {
        self.provider.get_logs(filter).await.context("eth_getLogs")
    }

    async fn subscribe_logs(&self, filter: &Filter) -> anyhow::Result<broadcast::Receiver<Log>> {
        let poller = self
            .provider
            .watch_logs(filter)
            .await
            .context("eth_newFilter")?;

        let (logs_tx, logs_rx) = broadcast::channel(LOG_CHANNEL_CAPACITY);

        // The forwarder lives as long as someone holds a receiver; once
        // every receiver is dropped the send fails and the poller stops.
        tokio::spawn(async move {
            let mut stream = poller.into_stream();
            while let Some(logs) = stream.next().await {
                for log in logs {
                    if logs_tx.send(log).is_err() {
                        return;
                    }
                }
            }
        });

        Ok(logs_rx)
    }

    async fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> anyhow::Result<Option<(Transaction, bool)>> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .context("eth_getTransactionByHash")?;

        Ok(tx.map(|tx| {
            let pending = tx.block_number.is_none();
            (tx, pending)
        }))
    }
}
