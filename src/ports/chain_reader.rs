//! Chain Reader Port - Block Retrieval Interface
//!
//! The narrow read surface the block source paces itself against: the
//! current head height and block-by-height lookup. "Block not found" is a
//! first-class condition here, not a generic error — the block source
//! treats it as "not produced yet, wait" and must be able to tell it
//! apart from a failing node.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Block;

/// Error returned by [`ChainReader`] lookups.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The requested block does not exist (yet) on the node.
    #[error("block not found")]
    NotFound,
    /// Any other transport or node failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReadError {
    /// Whether this is the expected not-produced-yet condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Capability trait for ordered block retrieval.
#[async_trait]
pub trait ChainReader: Send + Sync + 'static {
    /// Height of the most recent block the node knows about.
    async fn head_number(&self) -> Result<u64, ReadError>;

    /// Fetch the block at the given height, receipts included.
    ///
    /// `None` means the latest block.
    async fn block_by_number(&self, number: Option<u64>) -> Result<Block, ReadError>;
}
