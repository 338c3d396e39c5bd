//! Connection settings for the single-shot session.
//!
//! `Config` carries the broker address and credentials plus a handful of
//! session timings. All constraints are declared with `validator` attributes
//! and checked before a client is built, so an invalid value fails at load
//! time rather than at connect time.

use std::{fmt, time::Duration};

use uuid::Uuid;
use validator::Validate;

/// MQTT broker connection settings.
#[derive(Clone, Validate)]
pub struct Config {
    /// Broker username.
    pub username: String,

    /// Broker password. Never printed by `Debug`.
    pub password: String,

    /// Broker hostname or IP address.
    ///
    /// DNS resolution happens at connect time, not validation time.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port number.
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Client identifier sent in CONNECT.
    #[validate(length(
        min = 1,
        max = 36,
        message = "Client ID must be between 1 and 36 characters"
    ))]
    pub client_id: String,

    /// Keep-alive interval in seconds.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// How long to wait for the broker's CONNACK, in seconds.
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connection timeout must be between 1 and 300 seconds"
    ))]
    pub connection_timeout: u64,

    /// How long the final write-flush cycle may take, in seconds.
    #[validate(range(
        min = 1,
        max = 300,
        message = "Flush timeout must be between 1 and 300 seconds"
    ))]
    pub flush_timeout: u64,
}

impl Config {
    /// Builds a configuration with default timings for the given broker.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout)
    }
}

/// Generates a client identifier that fits the 36 character limit.
pub fn generate_client_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("ouman-{}", &id[..16])
}

impl Default for Config {
    fn default() -> Self {
        Config {
            username: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 1883,
            client_id: generate_client_id(),
            keep_alive: 60,
            connection_timeout: 10,
            flush_timeout: 5,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("keep_alive", &self.keep_alive)
            .field("connection_timeout", &self.connection_timeout)
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}
