//! HRV Store - Append-only, day-partitioned telemetry persistence
//!
//! This crate provides:
//! - The line format of a partition file
//! - The partition storage port with filesystem and in-memory backends
//! - The record store: idempotent appends and closed-interval range queries

pub mod line;
pub mod storage;
pub mod store;

pub use line::*;
pub use storage::*;
pub use store::*;
