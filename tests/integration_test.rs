//! Integration Tests - End-to-end Component Testing
//!
//! Tests the interaction between the synchronization components and the
//! chain ports. Uses mockall for trait mocking and tokio::test for
//! async tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy::rpc::types::{Filter, Log, Transaction, TransactionReceipt, TransactionRequest};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use mockall::mock;
use tokio::sync::broadcast;

use chainsync::adapters::chain::{
    BlockSourceConfig, ConfirmationGatedBlockSource, GasPriceCache, NonceTrackingBackend,
};
use chainsync::domain::Block;
use chainsync::ports::{ChainBackend, ChainReader, ReadError};

// ---- Mock Definitions ----

mock! {
    pub Backend {}

    #[async_trait::async_trait]
    impl ChainBackend for Backend {
        async fn code_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<Bytes>;
        async fn call_contract(
            &self,
            request: &TransactionRequest,
            block: Option<u64>,
        ) -> anyhow::Result<Bytes>;
        async fn pending_code_at(&self, address: Address) -> anyhow::Result<Bytes>;
        async fn pending_nonce_at(&self, account: Address) -> anyhow::Result<u64>;
        async fn suggest_gas_price(&self) -> anyhow::Result<u128>;
        async fn estimate_gas(&self, request: &TransactionRequest) -> anyhow::Result<u64>;
        async fn send_transaction(&self, tx: &TxEnvelope) -> anyhow::Result<()>;
        async fn transaction_receipt(
            &self,
            tx_hash: B256,
        ) -> anyhow::Result<Option<TransactionReceipt>>;
        async fn balance_at(&self, address: Address, block: Option<u64>) -> anyhow::Result<U256>;
        async fn filter_logs(&self, filter: &Filter) -> anyhow::Result<Vec<Log>>;
        async fn subscribe_logs(
            &self,
            filter: &Filter,
        ) -> anyhow::Result<broadcast::Receiver<Log>>;
        async fn transaction_by_hash(
            &self,
            tx_hash: B256,
        ) -> anyhow::Result<Option<(Transaction, bool)>>;
    }
}

mock! {
    pub Reader {}

    #[async_trait::async_trait]
    impl ChainReader for Reader {
        async fn head_number(&self) -> Result<u64, ReadError>;
        async fn block_by_number(&self, number: Option<u64>) -> Result<Block, ReadError>;
    }
}

// ---- Helpers ----

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn signed_tx(signer: &PrivateKeySigner, nonce: u64) -> TxEnvelope {
    let tx = TxEip1559 {
        chain_id: 1,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: 1_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(Address::ZERO),
        value: U256::from(1u64),
        access_list: Default::default(),
        input: Bytes::new(),
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash()).unwrap();
    TxEnvelope::Eip1559(tx.into_signed(signature))
}

fn make_block(number: u64) -> Block {
    Block {
        number,
        hash: B256::with_last_byte(number as u8),
        miner: Address::ZERO,
        difficulty: U256::ZERO,
        extra_data: Bytes::new(),
        gas_limit: 30_000_000,
        gas_used: 0,
        timestamp: Utc::now(),
        transactions: vec![],
    }
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_nonce_tracker_bridges_lagging_node() {
    let signer = PrivateKeySigner::random();
    let watched = signer.address();

    let mut mock_backend = MockBackend::new();
    // The node's pending-pool view never moves past 12.
    mock_backend
        .expect_pending_nonce_at()
        .returning(|_| Ok(12));
    mock_backend.expect_send_transaction().returning(|_| Ok(()));

    let backend = NonceTrackingBackend::new(mock_backend, [watched]);

    assert_eq!(backend.pending_nonce_at(watched).await.unwrap(), 12);

    // A successful send at nonce 50 raises the local view to 51.
    backend
        .send_transaction(&signed_tx(&signer, 50))
        .await
        .unwrap();
    assert_eq!(backend.pending_nonce_at(watched).await.unwrap(), 51);

    // A later send with a lower nonce never lowers it.
    backend
        .send_transaction(&signed_tx(&signer, 40))
        .await
        .unwrap();
    assert_eq!(backend.pending_nonce_at(watched).await.unwrap(), 51);
}

#[tokio::test]
async fn test_nonce_tracker_propagates_inner_errors() {
    let watched = PrivateKeySigner::random().address();

    let mut mock_backend = MockBackend::new();
    mock_backend
        .expect_pending_nonce_at()
        .returning(|_| Err(anyhow::anyhow!("node unreachable")));

    let backend = NonceTrackingBackend::new(mock_backend, [watched]);

    let err = backend.pending_nonce_at(watched).await.unwrap_err();
    assert!(err.to_string().contains("node unreachable"));
}

#[tokio::test(start_paused = true)]
async fn test_gas_cache_tracks_backend_price() {
    let price = Arc::new(AtomicU64::new(100));

    let mut mock_backend = MockBackend::new();
    {
        let price = Arc::clone(&price);
        mock_backend
            .expect_suggest_gas_price()
            .returning(move || Ok(u128::from(price.load(Ordering::SeqCst))));
    }

    let cache = GasPriceCache::new(Arc::new(mock_backend), Duration::from_secs(4))
        .await
        .unwrap();

    assert_eq!(cache.suggest_gas_price(), 100);

    price.store(250, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(cache.suggest_gas_price(), 250);

    cache.close().await;
    cache.close().await;
    assert_eq!(cache.suggest_gas_price(), 250);
}

#[tokio::test(start_paused = true)]
async fn test_block_source_delivers_confirmed_blocks_in_order() {
    init_tracing();

    // Head advances 10, 11, 12; with one confirmation the walk must
    // emit exactly 9, 10, 11, each once, strictly increasing.
    let script = Arc::new(Mutex::new(VecDeque::from([10u64, 11, 12])));
    let head = Arc::new(AtomicU64::new(0));

    let mut mock_reader = MockReader::new();
    {
        let script = Arc::clone(&script);
        let head = Arc::clone(&head);
        mock_reader.expect_head_number().returning(move || {
            if let Some(next) = script.lock().unwrap().pop_front() {
                head.store(next, Ordering::SeqCst);
            }
            Ok(head.load(Ordering::SeqCst))
        });
    }
    {
        let head = Arc::clone(&head);
        mock_reader
            .expect_block_by_number()
            .returning(move |number| match number {
                Some(n) if n < head.load(Ordering::SeqCst) => Ok(make_block(n)),
                _ => Err(ReadError::NotFound),
            });
    }

    let (source, mut blocks_rx) = ConfirmationGatedBlockSource::spawn(
        mock_reader,
        BlockSourceConfig {
            confirmations: 1,
            ..BlockSourceConfig::default()
        },
    );

    let mut heights = Vec::new();
    for _ in 0..3 {
        heights.push(blocks_rx.recv().await.unwrap().number);
    }
    assert_eq!(heights, vec![9, 10, 11]);

    source.close().await;
    source.close().await;
    assert!(blocks_rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_block_source_survives_flaky_head_queries() {
    init_tracing();

    let attempts = Arc::new(AtomicU64::new(0));

    let mut mock_reader = MockReader::new();
    {
        let attempts = Arc::clone(&attempts);
        mock_reader.expect_head_number().returning(move || {
            // The first two queries fail; the walker must retry, not die.
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow::anyhow!("timeout").into())
            } else {
                Ok(20)
            }
        });
    }
    mock_reader
        .expect_block_by_number()
        .returning(|number| match number {
            Some(n) if n <= 15 => Ok(make_block(n)),
            _ => Err(ReadError::NotFound),
        });

    let (source, mut blocks_rx) = ConfirmationGatedBlockSource::spawn(
        mock_reader,
        BlockSourceConfig {
            confirmations: 5,
            ..BlockSourceConfig::default()
        },
    );

    assert_eq!(blocks_rx.recv().await.unwrap().number, 15);

    source.close().await;
}
