//! # ouman-bridge-mqtt: single-shot MQTT publishing
//!
//! A thin layer over `rumqttc` for processes that connect, publish a batch of
//! messages once, and exit. It adds:
//!
//! - **Validated settings** (`Config`) with `validator` constraints
//! - **A blocking CONNACK wait** that hands the connect outcome to one
//!   continuation, instead of a long-lived callback
//! - **A bounded write-flush cycle** that returns once DISCONNECT is written
//!
//! # Quick Start
//!
//! ```ignore
//! use ouman_bridge_mqtt::{Config, OneShotSession, OutgoingMessage};
//!
//! let config = Config::new("mqtt.local", 1883, "user", "password");
//! let report = OneShotSession::new(&config)?
//!     .run(|outcome| {
//!         if !outcome.is_accepted() {
//!             eprintln!("CONNACK: {}", outcome.return_code());
//!         }
//!         vec![OutgoingMessage::at_most_once("home/eh203/ulkolampotila/value", "23")]
//!     })
//!     .await?;
//! println!("{} of {} sent", report.sent, report.requested);
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! new(config) ──> run(on_connect)
//!                   │
//!              CONNECT ──(CONNACK)──> on_connect(outcome) ──> PUBLISH × n
//!                                                               │
//!                                                          DISCONNECT
//! ```
//!
//! There is no reconnection: a refused CONNACK is reported in the outcome and
//! nothing is flushed; any other network failure is returned as
//! `TransferError`.

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod session;

pub use client::ClientBuilder;
pub use config::Config;
pub use error::TransferError;
pub use message::OutgoingMessage;
pub use rumqttc::{ConnectReturnCode, QoS};
pub use session::{ConnectOutcome, OneShotSession, SessionReport};

/// Result type for MQTT operations.
pub type Result<T> = std::result::Result<T, TransferError>;
