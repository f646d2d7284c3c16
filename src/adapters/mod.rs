//! Adapters - Transport-facing Implementations of the Ports
//!
//! The outer ring of the hexagonal layout. Everything that knows about
//! alloy, RPC payloads or wire behavior lives here.

pub mod chain;
