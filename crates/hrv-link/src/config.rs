//! Link configuration

use std::time::Duration;

use hrv_core::READJUST_ERROR_CODE;
use hrv_wire::{
    GattId, ERROR_CHARACTERISTIC, HRV_CHARACTERISTIC, HRV_SERVICE, REQUEST_CHARACTERISTIC,
};

/// Connection and monitoring parameters
#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    /// Service the wearable advertises
    pub service: GattId,
    /// Characteristic notifying telemetry frames
    pub telemetry_characteristic: GattId,
    /// Characteristic notifying error frames
    pub error_characteristic: GattId,
    /// Characteristic accepting records requests
    pub request_characteristic: GattId,
    /// Connect attempts before the pairing is dropped
    pub max_connect_attempts: u32,
    /// Delay before restarting after a failed sequence
    pub restart_delay: Duration,
    /// How far back the history backfill reaches
    pub backfill_days: u32,
    /// Window in which repeated faults count as a burst
    pub burst_window: Duration,
    /// Faults within the window that escalate
    pub burst_limit: u32,
    /// Fault code counted by the burst monitor
    pub readjust_code: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            service: HRV_SERVICE,
            telemetry_characteristic: HRV_CHARACTERISTIC,
            error_characteristic: ERROR_CHARACTERISTIC,
            request_characteristic: REQUEST_CHARACTERISTIC,
            max_connect_attempts: 5,
            restart_delay: Duration::from_secs(30),
            backfill_days: 7,
            burst_window: Duration::from_secs(60 * 60),
            burst_limit: 5,
            readjust_code: READJUST_ERROR_CODE,
        }
    }
}

impl LinkConfig {
    pub fn with_max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = attempts.max(1);
        self
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn with_backfill_days(mut self, days: u32) -> Self {
        self.backfill_days = days;
        self
    }

    pub fn with_burst(mut self, window: Duration, limit: u32) -> Self {
        self.burst_window = window;
        self.burst_limit = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.max_connect_attempts, 5);
        assert_eq!(config.restart_delay, Duration::from_secs(30));
        assert_eq!(config.burst_window, Duration::from_secs(3600));
        assert_eq!(config.burst_limit, 5);
        assert_eq!(config.service, GattId(0x180F));
    }

    #[test]
    fn test_builders_clamp() {
        let config = LinkConfig::default()
            .with_max_connect_attempts(0)
            .with_burst(Duration::from_secs(10), 0);
        assert_eq!(config.max_connect_attempts, 1);
        assert_eq!(config.burst_limit, 1);
    }
}
