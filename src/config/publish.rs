//! `[publish]` section: where measurements go and which ones.

use validator::{Validate, ValidationError};

/// Topic prefix and the ordered list of measurement names to publish.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct PublishSettings {
    /// Prepended verbatim to every value name, e.g. `home/eh203/`.
    #[validate(
        length(max = 255, message = "Topic prefix must not exceed 255 characters"),
        custom(function = "validate_topic_prefix")
    )]
    pub topic_prefix: String,

    /// Normalized value names, in configuration order.
    #[validate(length(min = 1, message = "At least one value must be published"))]
    pub value_names: Vec<String>,
}

impl PublishSettings {
    pub fn new(topic_prefix: impl Into<String>, values: &str) -> Self {
        Self {
            topic_prefix: topic_prefix.into(),
            value_names: parse_value_names(values),
        }
    }

    /// Full topic for one value name.
    pub fn topic_for(&self, value_name: &str) -> String {
        format!("{}{}/value", self.topic_prefix, value_name)
    }
}

fn validate_topic_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.contains(['+', '#']) {
        let mut err = ValidationError::new("invalid_topic_prefix");
        err.message = Some(format!("Topic prefix '{}' contains an MQTT wildcard", prefix).into());
        return Err(err);
    }
    Ok(())
}

/// Normalizes one configured value name: trimmed, lower-case, spaces as
/// underscores.
pub fn parse_value_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Splits the comma separated `values` key. Empty items are dropped.
pub fn parse_value_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(parse_value_name)
        .filter(|name| !name.is_empty())
        .collect()
}
