//! Protocol table of supported Ouman controllers.
//!
//! Each model lists the query identifiers it answers, in polling order. The
//! identifier is sent verbatim over the serial line and, once normalized,
//! becomes the measurement key.

use super::error::DeviceError;

/// One entry of a model's query table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryKey {
    /// Query string sent to the device, also the human-readable name.
    pub id: &'static str,
    /// Unit of the reply, used only for logging.
    pub unit: &'static str,
}

const fn key(id: &'static str, unit: &'static str) -> QueryKey {
    QueryKey { id, unit }
}

/// A supported controller model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceModel {
    pub name: &'static str,
    pub description: &'static str,
    /// Serial line speed; framing is always 8N1.
    pub baud_rate: u32,
    pub queries: &'static [QueryKey],
}

const EH203_QUERIES: &[QueryKey] = &[
    key("Ulkolampotila", "°C"),
    key("L1 Menovesi", "°C"),
    key("L1 Paluuvesi", "°C"),
    key("L1 Huonelampotila", "°C"),
    key("L1 Venttiilin asento", "%"),
    key("L2 Menovesi", "°C"),
    key("L2 Paluuvesi", "°C"),
    key("L2 Huonelampotila", "°C"),
    key("L2 Venttiilin asento", "%"),
    key("Kayttovesi", "°C"),
];

const EH201_QUERIES: &[QueryKey] = &[
    key("Ulkolampotila", "°C"),
    key("L1 Menovesi", "°C"),
    key("L1 Paluuvesi", "°C"),
    key("L1 Huonelampotila", "°C"),
    key("L1 Venttiilin asento", "%"),
];

static MODELS: &[DeviceModel] = &[
    DeviceModel {
        name: "EH203",
        description: "Ouman EH-203, two heating circuits and domestic hot water",
        baud_rate: 4800,
        queries: EH203_QUERIES,
    },
    DeviceModel {
        name: "EH201",
        description: "Ouman EH-201, single heating circuit",
        baud_rate: 4800,
        queries: EH201_QUERIES,
    },
];

/// Lookup facade over the static model table.
pub struct Models;

impl Models {
    /// Exact-match lookup by model name.
    pub fn get(name: &str) -> Result<&'static DeviceModel, DeviceError> {
        MODELS
            .iter()
            .find(|model| model.name == name)
            .ok_or_else(|| DeviceError::UnknownModel(name.to_string()))
    }

    /// Names of all supported models, sorted.
    pub fn list() -> Vec<&'static str> {
        let mut names: Vec<_> = MODELS.iter().map(|model| model.name).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::core::measurement::normalize_key;

    #[test]
    fn test_get_known_model() {
        let model = Models::get("EH203").unwrap();
        assert_eq!(model.name, "EH203");
        assert_eq!(model.queries[0].id, "Ulkolampotila");
        assert!(model.description.contains("EH-203"));
    }

    #[test]
    fn test_lookup_is_exact_match() {
        assert!(Models::get("EH203").is_ok());
        assert!(Models::get("eh203").is_err());
        assert!(matches!(
            Models::get("EH999"),
            Err(DeviceError::UnknownModel(name)) if name == "EH999"
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        assert_eq!(Models::list(), vec!["EH201", "EH203"]);
    }

    #[test]
    fn test_normalized_keys_are_unique_per_model() {
        for name in Models::list() {
            let model = Models::get(name).unwrap();
            let keys: HashSet<_> = model.queries.iter().map(|q| normalize_key(q.id)).collect();
            assert_eq!(keys.len(), model.queries.len(), "duplicate key in {}", name);
        }
    }
}
