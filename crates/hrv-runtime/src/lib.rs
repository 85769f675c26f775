//! HRV Runtime - Service wiring
//!
//! Builds every component from a [`RuntimeConfig`] and runs them as tokio
//! tasks:
//! - Connection manager driving the wearable link
//! - Telemetry pipeline fed by the telemetry notification channel
//! - Error-burst monitor fed by the error notification channel
//!
//! [`RuntimeHandle`] is the surface left to the embedding application.

pub mod config;
pub mod logging;
pub mod service;

pub use config::*;
pub use logging::*;
pub use service::*;
