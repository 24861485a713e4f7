//! Configuration management for the QR scan service.
//!
//! This module handles loading and validating configuration from environment
//! variables and configuration files.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the scanner service.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Frame source configuration
    pub source: SourceConfig,

    /// Report artifact configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// On-screen overlay configuration
    #[serde(default)]
    pub display: DisplayConfig,

    /// Duplicate alert configuration
    #[serde(default)]
    pub alert: AlertConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Frame source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Acquisition backend selector. `dir:<path>` replays a directory of
    /// image files as the frame stream.
    pub identifier: String,

    /// Minimum delay between successive frame reads in milliseconds
    /// (0 = read as fast as the source delivers)
    #[serde(default)]
    pub min_frame_interval_ms: u64,
}

/// Report artifact configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Destination path for the persisted artifact
    #[serde(default = "default_report_path")]
    pub path: String,

    /// When a frame's decode results trigger a report rewrite
    #[serde(default)]
    pub trigger_policy: ReportTriggerPolicy,

    /// How repeat observations of a payload are projected into rows
    #[serde(default)]
    pub recording_mode: RecordingMode,

    /// Whether to include the running `scan_count` column
    #[serde(default = "default_include_scan_count")]
    pub include_scan_count: bool,
}

/// Overlay/display configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Truncation threshold for on-screen payload labels, in characters
    #[serde(default = "default_label_max_length")]
    pub label_max_length: usize,
}

/// Duplicate alert configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Whether duplicate classifications drive the alert actuator
    #[serde(default = "default_alert_enabled")]
    pub enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Policy governing when the report writer fires after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportTriggerPolicy {
    /// Rewrite after any frame that produced at least one decoded symbol
    #[default]
    AnyDecodedSymbol,

    /// Rewrite only after frames that produced a newly seen payload
    OnlyNewSymbols,
}

/// How repeat observations are projected into report rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordingMode {
    /// One row per observation; repeats each get their own row
    #[default]
    EveryOccurrence,

    /// One row per distinct payload carrying the latest observation and a
    /// cumulative count
    LatestPerPayload,
}

// Default value functions
fn default_report_path() -> String {
    "qr_scan_report.xlsx".to_string()
}
fn default_include_scan_count() -> bool {
    true
}
fn default_label_max_length() -> usize {
    20
}
fn default_alert_enabled() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            trigger_policy: ReportTriggerPolicy::default(),
            recording_mode: RecordingMode::default(),
            include_scan_count: default_include_scan_count(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            label_max_length: default_label_max_length(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: default_alert_enabled(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default config file (config/default.toml)
    /// 2. Environment-specific config (config/{env}.toml)
    /// 3. Environment variables (prefixed with QRLEDGER_)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Override with environment variables (e.g., QRLEDGER_SOURCE__IDENTIFIER)
            .add_source(
                Environment::with_prefix("QRLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Create configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("QRLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.source.identifier.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "source.identifier".to_string(),
            ));
        }

        if self.report.path.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "report.path".to_string(),
            ));
        }
        if !self.report.path.ends_with(".xlsx") {
            return Err(ConfigValidationError::InvalidValue {
                field: "report.path".to_string(),
                message: "Artifact path must end with .xlsx".to_string(),
            });
        }

        if self.display.label_max_length == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "display.label_max_length".to_string(),
                message: "Label length must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl SourceConfig {
    /// Get the minimum frame interval as a Duration.
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_millis(self.min_frame_interval_ms)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
