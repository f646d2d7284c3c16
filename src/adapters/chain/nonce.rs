//! Nonce Tracking Backend - Gap-free Sequencing for Watched Accounts
//!
//! Decorates a [`ChainBackend`] so that the "next nonce" for a fixed set
//! of watched accounts stays correct even while the node's pending-pool
//! view lags behind transactions this process has already sent. The
//! decorator keeps a local watermark per watched account: queries return
//! the maximum of the node's answer and the watermark, and every
//! successfully sent transaction raises the watermark past its own nonce.
//!
//! # Concurrency contract
//!
//! The decorator is NOT safe for unsynchronized concurrent use per
//! account. The internal mutex only keeps the shared-reference trait
//! surface memory-safe; a gap-free nonce sequence additionally requires
//! that each `pending_nonce_at` / `send_transaction` pair for an account
//! is externally serialized (one task, or one held [`SerializedBackend`]
//! guard). Interleaved pairs from concurrent tasks can produce duplicate
//! or gapped nonces — the inner network round-trip cannot be made atomic
//! by any lock inside this type.

use std::collections::HashMap;

use alloy::consensus::{Transaction as _, TxEnvelope};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::{Filter, Log, Transaction, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::debug;

use crate::ports::{ChainBackend, PendingBlockControl};

/// Backend decorator that tracks a per-account nonce watermark.
///
/// Watermarks exist only for the accounts given at construction; every
/// other account passes through untouched. Watermarks are monotonically
/// non-decreasing for the lifetime of the decorator and are never
/// persisted.
pub struct NonceTrackingBackend<B> {
    inner: B,
    /// Highest known "next nonce" per watched account.
    watermarks: Mutex<HashMap<Address, u64>>,
}

impl<B: ChainBackend> NonceTrackingBackend<B> {
    /// Wrap `inner`, watching the given accounts.
    ///
    /// Every watched account starts with a watermark of zero; the first
    /// `pending_nonce_at` raises it to the node's view.
    pub fn new(inner: B, watched: impl IntoIterator<Item = Address>) -> Self {
        let watermarks = watched.into_iter().map(|account| (account, 0)).collect();

        Self {
            inner,
            watermarks: Mutex::new(watermarks),
        }
    }

    /// Access the wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Raise the sender's watermark after a successful send.
    ///
    /// Best effort: when the signer cannot be recovered from the
    /// signature, the transaction is still considered sent but the local
    /// bookkeeping is left untouched.
    async fn raise_watermark(&self, tx: &TxEnvelope) {
        let signer = match tx.recover_signer() {
            Ok(signer) => signer,
            Err(e) => {
                debug!(error = %e, "signer recovery failed, nonce bookkeeping skipped");
                return;
            }
        };

        let mut watermarks = self.watermarks.lock().await;
        if let Some(watermark) = watermarks.get_mut(&signer) {
            let next = tx.nonce() + 1;
            if next > *watermark {
                *watermark = next;
            }
        }
    }
}

#[async_trait]
impl<B: ChainBackend> ChainBackend for NonceTrackingBackend<B> {
    async fn code_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<Bytes> {
        self.inner.code_at(address, block).await
    }

    async fn call_contract(
        &self,
        request: &TransactionRequest,
        block: Option<u64>,
    ) -> anyhow::Result<Bytes> {
        self.inner.call_contract(request, block).await
    }

    async fn pending_code_at(&self, address: Address) -> anyhow::Result<Bytes> {
        self.inner.pending_code_at(address).await
    }

    /// Pending nonce with the local watermark folded in.
    ///
    /// Inner errors propagate unchanged and touch no state. For a watched
    /// account the result is `max(inner, watermark)`; when the node has
    /// overtaken the watermark, the watermark is raised to match.
    async fn pending_nonce_at(&self, account: Address) -> anyhow::Result<u64> {
        let nonce = self.inner.pending_nonce_at(account).await?;

        let mut watermarks = self.watermarks.lock().await;
        let Some(watermark) = watermarks.get_mut(&account) else {
            return Ok(nonce);
        };

        if nonce > *watermark {
            *watermark = nonce;
            Ok(nonce)
        } else {
            Ok(*watermark)
        }
    }

    async fn suggest_gas_price(&self) -> anyhow::Result<u128> {
        self.inner.suggest_gas_price().await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> anyhow::Result<u64> {
        self.inner.estimate_gas(request).await
    }

    /// Send through the inner backend, then raise the signer's watermark.
    ///
    /// An inner error is returned unchanged with no state change — the
    /// transaction did not necessarily reach the network. The transaction
    /// may still fail on chain later; the watermark is raised regardless,
    /// because the nonce is consumed either way.
    async fn send_transaction(&self, tx: &TxEnvelope) -> anyhow::Result<()> {
        self.inner.send_transaction(tx).await?;
        self.raise_watermark(tx).await;
        Ok(())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> anyhow::Result<Option<TransactionReceipt>> {
        self.inner.transaction_receipt(tx_hash).await
    }

    async fn balance_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<U256> {
        self.inner.balance_at(address, block).await
    }

    async fn filter_logs(&self, filter: &Filter) -> anyhow::Result<Vec<Log>> {
        self.inner.filter_logs(filter).await
    }

    async fn subscribe_logs(&self, filter: &Filter) -> anyhow::Result<broadcast::Receiver<Log>> {
        self.inner.subscribe_logs(filter).await
    }

    async fn transaction_by_hash(
        &self,
        tx_hash: B256,
    ) -> anyhow::Result<Option<(Transaction, bool)>> {
        self.inner.transaction_by_hash(tx_hash).await
    }
}

/// Capability forwarding: when the wrapped backend is a simulated chain
/// with explicit pending-block control, the decorator re-exposes it, so
/// test code can advance the chain through the full decorator stack. The
/// probe happens in the type system — the impl exists exactly when the
/// inner type has the capability.
#[async_trait]
impl<B> PendingBlockControl for NonceTrackingBackend<B>
where
    B: ChainBackend + PendingBlockControl,
{
    async fn commit(&self) {
        self.inner.commit().await;
    }

    async fn rollback(&self) {
        self.inner.rollback().await;
    }
}

/// External-serialization wrapper for callers that need concurrency.
///
/// Holds the backend behind an async mutex and hands out an exclusive
/// guard. Holding the guard across a `pending_nonce_at` /
/// `send_transaction` pair is what makes the pair atomic with respect to
/// other tasks; the decorator itself never provides that.
pub struct SerializedBackend<B> {
    inner: Mutex<B>,
}

impl<B: ChainBackend> SerializedBackend<B> {
    /// Wrap a backend (typically a [`NonceTrackingBackend`]).
    pub fn new(inner: B) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Exclusive access to the backend for a sequence of calls.
    pub async fn lock(&self) -> MutexGuard<'_, B> {
        self.inner.lock().await
    }
}
