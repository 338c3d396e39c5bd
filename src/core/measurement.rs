//! Measurement values, key normalization and the per-run measurement map.

use std::{collections::BTreeMap, fmt, num::IntErrorKind};

use serde::Serialize;
use thiserror::Error;

/// A single value read from the controller.
///
/// Replies are coerced in order: integer, float, raw text. Integers that
/// overflow `i64` and non-finite floats stay text so the payload keeps the
/// device's digits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MeasurementValue {
    /// Coerces a device reply. The reply is trimmed first.
    pub fn coerce(reply: &str) -> Self {
        let reply = reply.trim();
        match reply.parse::<i64>() {
            Ok(value) => return MeasurementValue::Integer(value),
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                return MeasurementValue::Text(reply.to_string())
            }
            Err(_) => {}
        }
        match reply.parse::<f64>() {
            Ok(value) if value.is_finite() => MeasurementValue::Float(value),
            _ => MeasurementValue::Text(reply.to_string()),
        }
    }

    /// MQTT payload for this value.
    pub fn to_payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Integer(value) => write!(f, "{}", value),
            // Debug keeps the decimal point on integral floats ("23.0").
            MeasurementValue::Float(value) => write!(f, "{:?}", value),
            MeasurementValue::Text(value) => f.write_str(value),
        }
    }
}

/// Normalizes a device query identifier into a measurement key:
/// spaces and hyphens become underscores, then lower-case.
///
/// Idempotent on already-normalized keys.
pub fn normalize_key(raw: &str) -> String {
    raw.replace([' ', '-'], "_").to_lowercase()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeasurementError {
    #[error("Measurement '{0}' was not collected")]
    NotFound(String),
}

/// Mapping from normalized key to value, built fresh on every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasurementMap {
    values: BTreeMap<String, MeasurementValue>,
}

impl MeasurementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under an already-normalized key.
    pub fn insert(&mut self, key: impl Into<String>, value: MeasurementValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Result<&MeasurementValue, MeasurementError> {
        self.values
            .get(key)
            .ok_or_else(|| MeasurementError::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, MeasurementValue)> for MeasurementMap {
    fn from_iter<I: IntoIterator<Item = (K, MeasurementValue)>>(iter: I) -> Self {
        let mut map = MeasurementMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
