//! Measurement collection for one controller model.
//!
//! The collector walks the model's query table in order, asks the device for
//! each key and builds the `MeasurementMap`. A failed query is logged and
//! skipped; it never aborts the run.

use tracing::{debug, error, info};

use super::{
    device::{DeviceModel, QueryChannel},
    measurement::{normalize_key, MeasurementMap, MeasurementValue},
};

/// Polls every query key of `model` through `channel`.
pub struct MeasurementCollector<'a, C> {
    channel: C,
    model: &'a DeviceModel,
}

impl<'a, C: QueryChannel> MeasurementCollector<'a, C> {
    pub fn new(channel: C, model: &'a DeviceModel) -> Self {
        Self { channel, model }
    }

    /// Runs one pass over the model's query table.
    pub fn collect(mut self) -> MeasurementMap {
        let mut measurements = MeasurementMap::new();

        for key in self.model.queries {
            let reply = match self.channel.query(key.id) {
                Ok(reply) => reply,
                Err(e) => {
                    error!("{}: ERROR ({})", key.id, e);
                    continue;
                }
            };

            if reply.is_empty() {
                error!("{}: ERROR", key.id);
                continue;
            }

            info!("From device {}: {} {}", key.id, reply, key.unit);
            measurements.insert(normalize_key(key.id), MeasurementValue::coerce(&reply));
        }

        debug!(
            "Collected {}/{} measurement(s) from {}",
            measurements.len(),
            self.model.queries.len(),
            self.model.name
        );
        measurements
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tracing_test::traced_test;

    use super::*;
    use crate::core::device::{DeviceError, Models};

    /// Answers from a fixed table and records the queries it saw.
    #[derive(Default)]
    struct ScriptedChannel {
        replies: HashMap<&'static str, Result<&'static str, ()>>,
        seen: Vec<String>,
    }

    impl ScriptedChannel {
        fn reply(mut self, query: &'static str, reply: &'static str) -> Self {
            self.replies.insert(query, Ok(reply));
            self
        }

        fn fail(mut self, query: &'static str) -> Self {
            self.replies.insert(query, Err(()));
            self
        }
    }

    impl QueryChannel for ScriptedChannel {
        fn query(&mut self, query: &str) -> Result<String, DeviceError> {
            self.seen.push(query.to_string());
            match self.replies.get(query) {
                Some(Ok(reply)) => Ok(reply.to_string()),
                Some(Err(())) => Err(DeviceError::Read {
                    query: query.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"),
                }),
                None => Ok(String::new()),
            }
        }
    }

    #[test]
    #[traced_test]
    fn test_collects_and_coerces_replies() {
        let model = Models::get("EH201").unwrap();
        let mut channel = ScriptedChannel::default()
            .reply("Ulkolampotila", "23")
            .reply("L1 Menovesi", "45.2")
            .reply("L1 Paluuvesi", "40.1")
            .reply("L1 Huonelampotila", "21.5")
            .reply("L1 Venttiilin asento", "N/A");

        let measurements = MeasurementCollector::new(&mut channel, model).collect();

        assert_eq!(measurements.len(), 5);
        assert_eq!(measurements.get("ulkolampotila"), Ok(&MeasurementValue::Integer(23)));
        assert_eq!(measurements.get("l1_menovesi"), Ok(&MeasurementValue::Float(45.2)));
        assert_eq!(
            measurements.get("l1_venttiilin_asento"),
            Ok(&MeasurementValue::Text("N/A".into()))
        );
        assert!(logs_contain("From device Ulkolampotila: 23"));
    }

    #[test]
    fn test_queries_follow_model_order() {
        let model = Models::get("EH201").unwrap();
        let mut channel = ScriptedChannel::default();

        MeasurementCollector::new(&mut channel, model).collect();

        let expected: Vec<_> = model.queries.iter().map(|q| q.id.to_string()).collect();
        assert_eq!(channel.seen, expected);
    }

    #[test]
    #[traced_test]
    fn test_empty_reply_is_logged_and_omitted() {
        let model = Models::get("EH201").unwrap();
        let mut channel = ScriptedChannel::default()
            .reply("Ulkolampotila", "23")
            .reply("L1 Menovesi", "");

        let measurements = MeasurementCollector::new(&mut channel, model).collect();

        assert!(measurements.contains("ulkolampotila"));
        assert!(!measurements.contains("l1_menovesi"));
        assert!(logs_contain("L1 Menovesi: ERROR"));
    }

    #[test]
    #[traced_test]
    fn test_transport_error_does_not_stop_collection() {
        let model = Models::get("EH201").unwrap();
        let mut channel = ScriptedChannel::default()
            .fail("Ulkolampotila")
            .reply("L1 Menovesi", "45.2");

        let measurements = MeasurementCollector::new(&mut channel, model).collect();

        assert!(!measurements.contains("ulkolampotila"));
        assert_eq!(measurements.get("l1_menovesi"), Ok(&MeasurementValue::Float(45.2)));
        assert!(logs_contain("Ulkolampotila: ERROR"));
        assert_eq!(channel.seen.len(), model.queries.len());
    }
}
