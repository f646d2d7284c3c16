//! Chain Backend Port - Node Interaction Interface
//!
//! Defines the capability surface an EVM node exposes for contract-bound
//! work: state reads, gas estimation, transaction submission, receipt and
//! log access. Decorators such as the nonce tracker wrap this trait and
//! re-export it unchanged, so application code never cares whether it
//! talks to the node directly or through a decorator stack.

use alloy::consensus::TxEnvelope;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::{Filter, Log, Transaction, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Capability trait for interacting with an EVM-compatible node.
///
/// Mirrors the calls a contract binding layer needs. All methods are
/// request/response: errors from the node propagate to the caller
/// unchanged, with no retry and no local state.
#[async_trait]
pub trait ChainBackend: Send + Sync + 'static {
    /// Get the code of the given account at a block height.
    ///
    /// `None` means the latest block. Needed to differentiate contract
    /// internal errors from a node that is still syncing.
    async fn code_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<Bytes>;

    /// Execute a contract call against the state at a block height.
    async fn call_contract(
        &self,
        request: &TransactionRequest,
        block: Option<u64>,
    ) -> anyhow::Result<Bytes>;

    /// Get the code of the given account in the pending state.
    async fn pending_code_at(&self, address: Address) -> anyhow::Result<Bytes>;

    /// Get the pending-pool nonce for an account.
    async fn pending_nonce_at(&self, account: Address) -> anyhow::Result<u64>;

    /// Get the node's suggested gas price in wei.
    async fn suggest_gas_price(&self) -> anyhow::Result<u128>;

    /// Estimate the gas needed to execute a transaction against pending
    /// state. A basis for a reasonable default, not a guarantee.
    async fn estimate_gas(&self, request: &TransactionRequest) -> anyhow::Result<u64>;

    /// Inject a signed transaction into the node's pending pool.
    async fn send_transaction(&self, tx: &TxEnvelope) -> anyhow::Result<()>;

    /// Get the receipt of a mined transaction, or `None` if not mined yet.
    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> anyhow::Result<Option<TransactionReceipt>>;

    /// Get the balance of an account at a block height (`None` = latest).
    async fn balance_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<U256>;

    /// Execute a one-shot log filter query.
    async fn filter_logs(&self, filter: &Filter) -> anyhow::Result<Vec<Log>>;

    /// Start a background log subscription for a filter.
    ///
    /// Returns a broadcast receiver that emits matching logs as the node
    /// reports them. Dropping every receiver ends the subscription.
    async fn subscribe_logs(&self, filter: &Filter) -> anyhow::Result<broadcast::Receiver<Log>>;

    /// Look up a transaction by hash in the pool and the chain.
    ///
    /// The boolean is `true` while the transaction is still pending.
    /// `None` if the node has never seen the hash.
    async fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> anyhow::Result<Option<(Transaction, bool)>>;
}

/// Extra capability of simulated in-memory chains: explicit control over
/// the pending block.
///
/// Production nodes never implement this; test chains use it to advance
/// the simulated chain deterministically. Decorators forward it when the
/// wrapped backend offers it, so test code keeps working through the
/// full decorator stack.
#[async_trait]
pub trait PendingBlockControl: Send + Sync {
    /// Import all pending transactions as a single block and start a
    /// fresh pending state.
    async fn commit(&self);

    /// Abort all pending transactions, reverting to the last committed
    /// state.
    async fn rollback(&self);
}
