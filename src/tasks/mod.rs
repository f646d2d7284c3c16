//! Task Infrastructure - Supervised Background Tasks and Caches
//!
//! The concurrency pattern shared by every long-lived component in the
//! crate: one background task per component, cooperative cancellation,
//! and an exactly-once close that joins the task before returning.

pub mod cache;
pub mod shutdown;

pub use cache::PollingCache;
pub use shutdown::BackgroundTask;
