//! JSON shape of outbound notifications
//!
//! ```json
//! {
//!   "event": "member_adjacency_enter",
//!   "data": { "entity_a": "person.alice", "distance_m": 42, ... },
//!   "fired_at": "2024-05-01T12:00:00.000Z"
//! }
//! ```
//!
//! `data` keeps the field order of [`AdjacencyEvent::fields`].

use adjacency_core::{AdjacencyEvent, AdjacencySnapshot, PayloadValue, Timestamp};
use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Number, Value};

use crate::{ConnectorError, ConnectorResult};

/// RFC 3339 rendering of a millisecond timestamp, UTC
///
/// Timestamps outside chrono's range fall back to the raw millisecond count.
pub fn rfc3339(timestamp: Timestamp) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp.to_string())
}

fn value_of(value: PayloadValue) -> Value {
    match value {
        PayloadValue::Null => Value::Null,
        PayloadValue::Bool(b) => Value::Bool(b),
        PayloadValue::Int(i) => Value::from(i),
        PayloadValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        PayloadValue::Text(s) => Value::String(s),
    }
}

/// Notification as a JSON document
pub fn event_json(event: &AdjacencyEvent, fired_at: Timestamp) -> Value {
    let data: Map<String, Value> = event
        .fields()
        .into_iter()
        .map(|(key, value)| (key.to_string(), value_of(value)))
        .collect();

    let mut doc = Map::new();
    doc.insert("event".into(), Value::String(event.name().into()));
    doc.insert("data".into(), Value::Object(data));
    doc.insert("fired_at".into(), Value::String(rfc3339(fired_at)));
    Value::Object(doc)
}

/// Serialized notification body
pub fn event_body(event: &AdjacencyEvent, fired_at: Timestamp) -> ConnectorResult<Vec<u8>> {
    serde_json::to_vec(&event_json(event, fired_at))
        .map_err(|e| ConnectorError::ProtocolError(e.to_string()))
}

/// Snapshot as a JSON document
pub fn snapshot_json(snapshot: &AdjacencySnapshot) -> ConnectorResult<Value> {
    serde_json::to_value(snapshot).map_err(|e| ConnectorError::ProtocolError(e.to_string()))
}
