//! HRV Test Harness - Simulated hardware and end-to-end validation
//!
//! This crate provides:
//! - A simulated wearable implementing the wireless transport port
//! - An alerter that records what it was asked to deliver
//! - An in-memory runtime harness and end-to-end scenarios

pub mod alerter;
pub mod integration;
pub mod simulator;

pub use alerter::*;
pub use integration::*;
pub use simulator::*;
