//! HRV Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every layer of the link:
//! - Telemetry records and device error frames
//! - Classification states
//! - UTC day keys used to partition storage
//! - Clock abstraction and the persisted preference store
//! - The error taxonomy

pub mod clock;
pub mod day;
pub mod error;
pub mod prefs;
pub mod record;
pub mod state;

pub use clock::*;
pub use day::*;
pub use error::*;
pub use prefs::*;
pub use record::*;
pub use state::*;
