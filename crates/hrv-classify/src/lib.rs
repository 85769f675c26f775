//! HRV Classify - Stress state and trend derivation
//!
//! This crate provides:
//! - User thresholds read from the preference store
//! - The tri-state classifier over sample and baseline windows
//! - Bucketed trend aggregation with per-point severity bands

pub mod classifier;
pub mod thresholds;
pub mod trend;

pub use classifier::*;
pub use thresholds::*;
pub use trend::*;
