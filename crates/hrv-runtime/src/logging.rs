//! Tracing initialisation

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use hrv_core::{HrvError, HrvResult};

/// Log line format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = HrvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(HrvError::Config(format!("unknown log format: {}", other))),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// Fails with [`HrvError::Config`] if a subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> HrvResult<()> {
    let result = match format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().json().with_target(true).with_current_span(true));
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_target(true).with_thread_names(true));
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    result.map_err(|e| HrvError::Config(format!("failed to set subscriber: {}", e)))?;
    tracing::debug!(?format, "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_second_init_is_an_error() {
        // the first call may lose to another test's subscriber; the second never wins
        let _ = init_tracing(LogFormat::Json);
        assert!(matches!(
            init_tracing(LogFormat::Pretty),
            Err(HrvError::Config(_))
        ));
    }
}
