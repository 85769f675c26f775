//! Telemetry records and device error frames

use std::fmt;

/// Error code the wearable reports when the sensor needs readjusting
pub const READJUST_ERROR_CODE: u8 = 1;

/// One timestamped HRV sample from the wearable.
///
/// Timestamps are Unix seconds (UTC). Records are immutable once written.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TelemetryRecord {
    pub timestamp: u32,
    pub metric: f32,
}

impl TelemetryRecord {
    #[inline]
    pub fn new(timestamp: u32, metric: f32) -> Self {
        TelemetryRecord { timestamp, metric }
    }

    /// Timestamp widened for interval arithmetic
    #[inline]
    pub fn unix_secs(&self) -> i64 {
        self.timestamp as i64
    }
}

/// Arithmetic mean of the metrics in a window, `None` for an empty window
pub fn mean_metric(records: &[TelemetryRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let sum: f64 = records.iter().map(|r| r.metric as f64).sum();
    Some(sum / records.len() as f64)
}

/// Fault reported by the wearable. Counted, never persisted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorFrame {
    pub code: u8,
}

impl ErrorFrame {
    #[inline]
    pub fn new(code: u8) -> Self {
        ErrorFrame { code }
    }

    /// Sensor fit fault ("readjustment needed")
    #[inline]
    pub fn is_readjust(self) -> bool {
        self.code == READJUST_ERROR_CODE
    }
}

impl fmt::Debug for ErrorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorFrame({:#04x})", self.code)
    }
}
