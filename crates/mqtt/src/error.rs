//! Error handling for the single-shot MQTT session.
//!
//! `TransferError` is the one error type returned by every fallible operation
//! in this crate. Variants are grouped by when they can occur:
//!
//! **Setup** (before any network traffic):
//! - `ConfigError`: validation failures in `Config`
//! - `ClientSetup`: the rumqttc client could not be constructed
//!
//! **Runtime**:
//! - `ClientTransfer`: a publish/disconnect request could not be queued
//! - `ClientConnection`: network-level failure talking to the broker
//! - `Timeout`: CONNACK or the final flush did not arrive in time
//!
//! A broker that answers CONNECT with a non-zero return code is *not* an
//! error here; it is reported through `ConnectOutcome` so callers can log it
//! and carry on.

use std::time::Duration;

use thiserror::Error;

/// The unified error type for MQTT session operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// MQTT client initialization failed.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Configuration validation failed.
    ///
    /// Raised when `Config` violates its `validator` constraints
    /// (empty host, keep-alive out of range, ...).
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// The local client failed to queue a request for the event loop.
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// Connection to the broker failed or was lost.
    ///
    /// Boxed to keep the enum small.
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// A bounded wait expired.
    #[error("Timed out after {elapsed:?} waiting for {stage}")]
    Timeout {
        stage: &'static str,
        elapsed: Duration,
    },
}

impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}
