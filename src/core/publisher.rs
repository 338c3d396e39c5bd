//! Publishing collected measurements to MQTT.
//!
//! One broker session per run. The CONNACK handling is a single continuation
//! over an explicit `PublishContext`; it decides what to send and the session
//! takes care of writing it out and disconnecting.

use async_trait::async_trait;
use ouman_bridge_mqtt::{
    ConnectOutcome, OneShotSession, OutgoingMessage, SessionReport, TransferError,
};
use tracing::{error, info, warn};

use super::measurement::MeasurementMap;
use crate::config::{MqttSettings, PublishSettings};

/// What the connect continuation needs: which values to send, and where.
pub struct PublishContext<'a> {
    settings: &'a PublishSettings,
    measurements: &'a MeasurementMap,
}

impl<'a> PublishContext<'a> {
    pub fn new(settings: &'a PublishSettings, measurements: &'a MeasurementMap) -> Self {
        Self {
            settings,
            measurements,
        }
    }

    /// Runs once the broker has answered CONNECT.
    ///
    /// A non-zero return code is logged and does not stop message
    /// production. Configured values that were not collected are logged and
    /// skipped.
    pub fn on_connect(&self, outcome: &ConnectOutcome) -> Vec<OutgoingMessage> {
        if !outcome.is_accepted() {
            warn!(
                "MQTT connection result code: {} ({})",
                outcome.return_code(),
                outcome.describe()
            );
        }

        let mut messages = Vec::with_capacity(self.settings.value_names.len());
        for name in &self.settings.value_names {
            let value = match self.measurements.get(name) {
                Ok(value) => value,
                Err(e) => {
                    error!("{}, not publishing it", e);
                    continue;
                }
            };

            let topic = self.settings.topic_for(name);
            info!("Publish values to {}, value={}", topic, value);
            messages.push(OutgoingMessage::at_most_once(topic, value.to_payload()));
        }
        messages
    }
}

/// Destination for one run's measurements.
#[async_trait]
pub trait MeasurementPublisher: Send + Sync {
    async fn publish(
        &self,
        settings: &PublishSettings,
        measurements: &MeasurementMap,
    ) -> Result<SessionReport, TransferError>;
}

/// Publishes over a single-shot MQTT session.
pub struct MqttPublisher {
    settings: MqttSettings,
}

impl MqttPublisher {
    pub fn new(settings: MqttSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl MeasurementPublisher for MqttPublisher {
    async fn publish(
        &self,
        settings: &PublishSettings,
        measurements: &MeasurementMap,
    ) -> Result<SessionReport, TransferError> {
        info!(
            "Connecting to MQTT broker {}:{}",
            self.settings.host, self.settings.port
        );
        let context = PublishContext::new(settings, measurements);
        OneShotSession::new(&self.settings)?
            .run(|outcome| context.on_connect(outcome))
            .await
    }
}
