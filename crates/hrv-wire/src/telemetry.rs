//! Telemetry frame
//!
//! Telemetry frame is 8 bytes:
//! - Bytes 0-3: Unix timestamp in seconds (LE, unsigned)
//! - Bytes 4-7: HRV metric (LE, IEEE-754 f32)

use bytes::{Buf, BufMut, Bytes, BytesMut};

use hrv_core::{HrvError, HrvResult, TelemetryRecord};

/// Telemetry frame size in bytes
pub const TELEMETRY_FRAME_SIZE: usize = 8;

/// Decode a telemetry notification. Trailing bytes are ignored.
pub fn decode_telemetry(buf: &[u8]) -> HrvResult<TelemetryRecord> {
    if buf.len() < TELEMETRY_FRAME_SIZE {
        return Err(HrvError::MalformedFrame {
            frame: "telemetry",
            expected: TELEMETRY_FRAME_SIZE,
            actual: buf.len(),
        });
    }

    let mut cursor = &buf[..TELEMETRY_FRAME_SIZE];
    let timestamp = cursor.get_u32_le();
    let metric = cursor.get_f32_le();

    Ok(TelemetryRecord { timestamp, metric })
}

/// Encode a record the way the wearable sends it
pub fn encode_telemetry(record: &TelemetryRecord) -> Bytes {
    let mut buf = BytesMut::with_capacity(TELEMETRY_FRAME_SIZE);
    buf.put_u32_le(record.timestamp);
    buf.put_f32_le(record.metric);
    buf.freeze()
}
