//! Chain Adapters - EVM Node Interaction Layer
//!
//! Concrete implementations of the chain ports plus the decorators and
//! caches that make the node safe to use under concurrency:
//! - RPC provider management via alloy-rs 0.9
//! - The backend/reader port implementations over that provider
//! - Nonce tracking for watched accounts
//! - Background-refreshed gas price estimates
//! - The confirmation-gated block stream

pub mod backend;
pub mod blocks;
pub mod gas;
pub mod nonce;
pub mod provider;
pub mod reader;

pub use backend::RpcBackend;
pub use blocks::{BlockSourceConfig, ConfirmationGatedBlockSource};
pub use gas::GasPriceCache;
pub use nonce::{NonceTrackingBackend, SerializedBackend};
pub use provider::RpcProvider;
pub use reader::RpcBlockReader;
