//! Logging setup.

use std::env;

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How log output is filtered and formatted.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Filter used when `RUST_LOG` is not set (e.g., "info", "decibel=debug").
    pub log_level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Defaults: `info`, plain text.
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Set the fallback filter.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Filter for this configuration; `RUST_LOG` wins when it is set and valid.
    pub fn env_filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error>> {
        if let Ok(directives) = env::var(EnvFilter::DEFAULT_ENV) {
            if let Ok(filter) = EnvFilter::try_new(&directives) {
                return Ok(filter);
            }
        }
        Ok(EnvFilter::try_new(&self.log_level)?)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global tracing subscriber.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = config.env_filter()?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
