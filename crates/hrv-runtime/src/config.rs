//! Runtime configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hrv_core::{HrvError, HrvResult};
use hrv_link::LinkConfig;

use crate::LogFormat;

/// Service configuration, loaded from JSON. Missing fields take defaults;
/// durations are whole seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding the `HRV-YYYYMMDD.txt` partitions
    pub data_dir: PathBuf,
    /// JSON file backing user preferences
    pub preferences_file: PathBuf,
    pub log_format: LogFormat,
    pub max_connect_attempts: u32,
    pub restart_delay_secs: u64,
    pub backfill_days: u32,
    pub burst_window_secs: u64,
    pub burst_limit: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let link = LinkConfig::default();
        RuntimeConfig {
            data_dir: PathBuf::from("data"),
            preferences_file: PathBuf::from("data/preferences.json"),
            log_format: LogFormat::default(),
            max_connect_attempts: link.max_connect_attempts,
            restart_delay_secs: link.restart_delay.as_secs(),
            backfill_days: link.backfill_days,
            burst_window_secs: link.burst_window.as_secs(),
            burst_limit: link.burst_limit,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(text: &str) -> HrvResult<Self> {
        serde_json::from_str(text).map_err(|e| HrvError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> HrvResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| HrvError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Rooted at `dir`: partitions directly in it, preferences beside them
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let data_dir = dir.into();
        RuntimeConfig {
            preferences_file: data_dir.join("preferences.json"),
            data_dir,
            ..Default::default()
        }
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::default()
            .with_max_connect_attempts(self.max_connect_attempts)
            .with_restart_delay(Duration::from_secs(self.restart_delay_secs))
            .with_backfill_days(self.backfill_days)
            .with_burst(Duration::from_secs(self.burst_window_secs), self.burst_limit)
    }
}
