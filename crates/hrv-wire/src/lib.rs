//! HRV Wire Protocol - Binary frames exchanged with the wearable
//!
//! Three fixed-size frames, multi-byte fields little-endian:
//! - Telemetry (8 bytes): timestamp + HRV metric
//! - Error (1 byte): device fault code
//! - Records request (4 bytes): history reference date
//!
//! Frames travel over GATT characteristics of one service; see [`gatt`].

pub mod error_frame;
pub mod gatt;
pub mod request;
pub mod telemetry;

pub use error_frame::*;
pub use gatt::*;
pub use request::*;
pub use telemetry::*;
