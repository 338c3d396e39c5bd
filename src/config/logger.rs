//! Logging configuration structures and validation logic.
//!
//! The bridge logs to the console only. The level comes from `--debug`, the
//! format from `--log-format`, and `RUST_LOG` overrides both filters when set.

use std::{fmt, str::FromStr};

use validator::{Validate, ValidationError};

/// Available formats for console log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

/// Top-level logging configuration.
#[derive(Debug, Clone, Validate)]
pub struct LoggerConfig {
    /// Global log level. Valid values: trace, debug, info, warn, error (case-insensitive).
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,

    /// Output format for console logs.
    pub format: LogFormat,

    /// Include the log target (module path) in output.
    pub show_target: bool,

    /// Enable ANSI color codes in console output.
    pub ansi_colors: bool,
}

impl LoggerConfig {
    /// Derives the configuration from the command line switches.
    pub fn from_cli(debug: bool, format: LogFormat) -> Self {
        LoggerConfig {
            level: if debug { "debug" } else { "info" }.to_string(),
            format,
            show_target: debug,
            ..Default::default()
        }
    }
}

/// Validates that the provided log level is one of the supported values.
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_log_level");
            err.message = Some(format!("Invalid log level: {}", level).into());
            Err(err)
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "info".to_string(),
            format: LogFormat::default(),
            show_target: false,
            ansi_colors: true,
        }
    }
}
