//! MQTT client builder.
//!
//! `ClientBuilder` wraps rumqttc's `MqttOptions` behind a fluent interface and
//! produces the `AsyncClient` / `EventLoop` pair the session drives.
//!
//! ```ignore
//! let (client, event_loop) = ClientBuilder::new("ouman", "localhost", 1883, 16)
//!     .credentials("user", "password")
//!     .keep_alive(60)
//!     .build()?;
//! ```

use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use validator::Validate;

use super::{config::Config, error::TransferError};

/// Default capacity of the request channel between client and event loop.
pub const DEFAULT_REQUEST_CAPACITY: usize = 16;

/// Builder for constructing an MQTT client and its event loop.
///
/// The builder is consumed by `build()`. The returned client queues requests;
/// nothing reaches the network until the event loop is polled.
pub struct ClientBuilder {
    /// MQTT protocol options (host, port, keep-alive, credentials, etc.)
    opts: MqttOptions,

    /// Capacity of the internal request queue.
    cap: usize,
}

impl ClientBuilder {
    /// Creates a builder with minimal configuration.
    pub fn new(client_id: impl Into<String>, host: impl Into<String>, port: u16, cap: usize) -> Self {
        Self {
            opts: MqttOptions::new(client_id, host, port),
            cap: cap.max(1),
        }
    }

    /// Creates a builder from a validated `Config`.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::ConfigError` when the config violates its
    /// constraints.
    pub fn from_config(config: &Config) -> Result<Self, TransferError> {
        config.validate()?;
        // rumqttc panics on such ids instead of returning an error.
        if config.client_id.starts_with(char::is_whitespace) {
            return Err(TransferError::ClientSetup(format!(
                "client id '{}' must not start with whitespace",
                config.client_id
            )));
        }

        let mut builder = Self::new(
            config.client_id.clone(),
            config.host.clone(),
            config.port,
            DEFAULT_REQUEST_CAPACITY,
        )
        .keep_alive(config.keep_alive)
        .clean_session(true);

        if !config.username.is_empty() {
            builder = builder.credentials(config.username.clone(), config.password.clone());
        }

        Ok(builder)
    }

    /// Sets the keep-alive interval (in seconds).
    pub fn keep_alive(mut self, secs: u64) -> Self {
        self.opts.set_keep_alive(Duration::from_secs(secs));
        self
    }

    /// Configures whether to use a clean session.
    ///
    /// A single-shot publisher has nothing to resume, so `from_config` always
    /// asks for a clean session.
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.opts.set_clean_session(clean);
        self
    }

    /// Sets MQTT authentication credentials sent in the CONNECT packet.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.opts.set_credentials(username, password);
        self
    }

    /// Constructs the MQTT client and event loop.
    pub fn build(self) -> Result<(AsyncClient, EventLoop), TransferError> {
        let (client, event_loop) = AsyncClient::new(self.opts, self.cap);
        Ok((client, event_loop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = ClientBuilder::new("test_client", "localhost", 1883, 100);
        assert_eq!(builder.cap, 100);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let builder = ClientBuilder::new("test_client", "localhost", 1883, 0);
        assert_eq!(builder.cap, 1);
    }

    #[test]
    fn test_builder_with_chain_methods() {
        let builder = ClientBuilder::new("test_client", "localhost", 1883, 100)
            .keep_alive(30)
            .clean_session(true)
            .credentials("user", "pass");

        assert_eq!(builder.opts.keep_alive(), Duration::from_secs(30));
        assert_eq!(
            builder.opts.credentials(),
            Some(("user".to_string(), "pass".to_string()))
        );
    }

    #[tokio::test]
    async fn test_build_from_config() {
        let config = Config::new("localhost", 1883, "hass", "secret");
        let builder = ClientBuilder::from_config(&config).unwrap();
        assert_eq!(builder.cap, DEFAULT_REQUEST_CAPACITY);
        assert!(builder.opts.clean_session());
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_from_config_without_username_skips_credentials() {
        let config = Config::new("localhost", 1883, "", "");
        let builder = ClientBuilder::from_config(&config).unwrap();
        assert!(builder.opts.credentials().is_none());
    }

    #[test]
    fn test_build_from_config_rejects_padded_client_id() {
        let config = Config {
            client_id: " ouman".to_string(),
            ..Config::new("localhost", 1883, "hass", "secret")
        };
        assert!(matches!(
            ClientBuilder::from_config(&config),
            Err(TransferError::ClientSetup(_))
        ));
    }

    #[test]
    fn test_build_from_config_invalid() {
        let config = Config::new("", 1883, "hass", "secret");
        let result = ClientBuilder::from_config(&config);
        assert!(matches!(result, Err(TransferError::ConfigError(_))));
    }
}
