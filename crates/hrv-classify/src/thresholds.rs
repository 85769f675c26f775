//! User-configured HRV thresholds

use tracing::warn;

use hrv_core::{HrvError, HrvResult, KeyValueStore, LOWER_HRV_KEY, UPPER_HRV_KEY};

/// Upper threshold when none is configured
pub const DEFAULT_UPPER_HRV: f64 = 200.0;

/// Lower threshold when none is configured
pub const DEFAULT_LOWER_HRV: f64 = 0.0;

/// Per-user classification bounds. Read, never owned, by the classifier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub upper: f64,
    pub lower: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            upper: DEFAULT_UPPER_HRV,
            lower: DEFAULT_LOWER_HRV,
        }
    }
}

impl Thresholds {
    pub fn new(upper: f64, lower: f64) -> Self {
        Thresholds { upper, lower }
    }

    /// Read both thresholds. Unset or non-numeric values fall back to their
    /// defaults; a failing store yields the defaults as well.
    pub fn load(prefs: &dyn KeyValueStore) -> Self {
        Thresholds {
            upper: load_one(prefs, UPPER_HRV_KEY, DEFAULT_UPPER_HRV),
            lower: load_one(prefs, LOWER_HRV_KEY, DEFAULT_LOWER_HRV),
        }
    }
}

fn load_one(prefs: &dyn KeyValueStore, key: &str, default: f64) -> f64 {
    let raw = match prefs.get(key) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "threshold unreadable, using default");
            return default;
        }
    };

    match parse_threshold(key, raw.as_deref()) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            warn!(error = %e, default, "using default threshold");
            default
        }
    }
}

/// Parse a stored threshold; `None` when unset or blank
pub fn parse_threshold(key: &str, raw: Option<&str>) -> HrvResult<Option<f64>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(HrvError::InvalidThreshold {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
