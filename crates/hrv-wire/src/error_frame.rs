//! Error frame
//!
//! Error frame is 1 byte:
//! - Byte 0: device fault code

use hrv_core::{ErrorFrame, HrvError, HrvResult};

/// Error frame size in bytes
pub const ERROR_FRAME_SIZE: usize = 1;

/// Decode an error notification
pub fn decode_error(buf: &[u8]) -> HrvResult<ErrorFrame> {
    match buf.first() {
        Some(&code) => Ok(ErrorFrame { code }),
        None => Err(HrvError::MalformedFrame {
            frame: "error",
            expected: ERROR_FRAME_SIZE,
            actual: 0,
        }),
    }
}

#[inline]
pub fn encode_error(frame: ErrorFrame) -> [u8; ERROR_FRAME_SIZE] {
    [frame.code]
}
