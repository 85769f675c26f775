//! HRV Link - Wearable connection lifecycle and frame handling
//!
//! This crate implements the live side of the system:
//! - Link state machine (discovery, pairing, bounded retry, recovery)
//! - Async connection manager over a platform transport port
//! - Telemetry ingestion: decode, store, reclassify, alert on change
//! - Error-burst monitoring of device fault frames
//! - Alerting port and adapters

pub mod alert;
pub mod burst;
pub mod config;
pub mod machine;
pub mod manager;
pub mod pairing;
pub mod pipeline;
pub mod transport;

pub use alert::*;
pub use burst::*;
pub use config::*;
pub use machine::*;
pub use manager::*;
pub use pairing::*;
pub use pipeline::*;
pub use transport::*;
