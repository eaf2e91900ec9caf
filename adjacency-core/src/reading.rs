//! Location readings as delivered by the host
//!
//! A reading is opaque to the host's state machine: a free-form state string
//! plus an attribute map whose shape depends on the integration that produced
//! it. The [`extract`](crate::extract) module pulls coordinates and accuracy
//! out of it; nothing else in the engine looks inside.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Attribute value as found in a host state object
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttributeValue {
    /// Explicit null
    Null,
    /// Boolean flag
    Bool(bool),
    /// Any number
    Number(f64),
    /// Text
    Text(String),
    /// Ordered list
    List(Vec<AttributeValue>),
    /// Nested map
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Coerce to a float the way hosts do: numbers as-is, numeric text parsed
    ///
    /// Booleans, lists and maps are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Borrow as a list
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.into())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        AttributeValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Latest known state of a subject
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationReading {
    /// Primary state string (zone name, "lat,lon", address, ...)
    #[cfg_attr(feature = "serde", serde(default))]
    pub state: Option<String>,

    /// Attribute map
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl LocationReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary state string
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Add or replace an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Reading with `latitude`/`longitude` attributes, the most common shape
    pub fn at(lat: f64, lon: f64) -> Self {
        Self::new()
            .with_attribute("latitude", lat)
            .with_attribute("longitude", lon)
    }

    /// Attribute by name, treating explicit null as absent
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn float_coercion() {
        assert_eq!(AttributeValue::from(12.5).as_f64(), Some(12.5));
        assert_eq!(AttributeValue::from(" 37.25 ").as_f64(), Some(37.25));
        assert_eq!(AttributeValue::from("north").as_f64(), None);
        assert_eq!(AttributeValue::from(true).as_f64(), None);
        assert_eq!(AttributeValue::from(vec![1.0, 2.0]).as_f64(), None);
    }

    #[test]
    fn null_attribute_is_absent() {
        let reading = LocationReading::new().with_attribute("accuracy", AttributeValue::Null);
        assert!(reading.attribute("accuracy").is_none());
    }

    #[test]
    fn deserializes_host_state_json() {
        let json = r#"{
            "state": "home",
            "attributes": {"latitude": 37.5, "longitude": "127.0", "gps_accuracy": 12, "source": null}
        }"#;
        let reading: LocationReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.state.as_deref(), Some("home"));
        assert_eq!(reading.attribute("latitude").and_then(AttributeValue::as_f64), Some(37.5));
        assert_eq!(reading.attribute("longitude").and_then(AttributeValue::as_f64), Some(127.0));
        assert!(reading.attribute("source").is_none());
    }
}
