//! Centralized logging configuration and initialization manager.
//!
//! The `LoggerManager` validates logging configuration and installs the
//! global `tracing` subscriber: one console layer on stdout in the configured
//! format, filtered by `RUST_LOG` when set and by the configured level
//! otherwise.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};
use validator::{Validate, ValidationErrors};

use crate::config::logger::{LogFormat, LoggerConfig};

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// A global subscriber was already installed.
    #[error("Logger initialization error: {0}")]
    InitializationError(#[from] tracing_subscriber::util::TryInitError),
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if configuration validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    /// Installs the global subscriber. Call once, before any tracing macro
    /// output is expected.
    pub fn init(&self) -> Result<(), LoggerError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.level));

        tracing_subscriber::registry()
            .with(self.console_layer(filter))
            .try_init()?;
        Ok(())
    }

    fn console_layer(&self, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let config = &self.config;
        let writer = io::stdout;
        match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        let config = LoggerConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_valid_config_accepted() {
        let config = LoggerConfig::from_cli(true, LogFormat::Pretty);
        assert!(LoggerManager::new(config).is_ok());
    }
}
