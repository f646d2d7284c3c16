//! chainsync — Concurrency-safe State Synchronization for EVM Nodes
//!
//! Sits between an application and a remote node reachable only through
//! an eventually-consistent, high-latency RPC interface. Provides:
//! - [`adapters::chain::NonceTrackingBackend`]: gap-free nonce
//!   sequencing for a fixed set of watched accounts
//! - [`tasks::PollingCache`] / [`adapters::chain::GasPriceCache`]:
//!   instantly-readable values kept fresh in the background
//! - [`adapters::chain::ConfirmationGatedBlockSource`]: an ordered,
//!   backpressured stream of blocks with a confirmation-depth guarantee

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tasks;
