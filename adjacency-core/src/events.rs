//! Outbound Notifications
//!
//! ## Overview
//!
//! Automations react to proximity through named notifications on the host
//! bus. The names and payload keys are the public contract; renaming either
//! breaks every automation written against them.
//!
//! | Variant | Name |
//! |---------|------|
//! | [`AdjacencyEvent::Entered`] | `member_adjacency_enter` |
//! | [`AdjacencyEvent::EnteredUnreliable`] | `member_adjacency_enter_unreliable` |
//! | [`AdjacencyEvent::Left`] | `member_adjacency_leave` |
//! | [`AdjacencyEvent::ProximityUpdate`] | `member_adjacency_proximity_update` |
//! | [`AdjacencyEvent::AnyEntered`] | `member_adjacency_any_enter` |
//! | [`AdjacencyEvent::AnyLeft`] | `member_adjacency_any_leave` |
//!
//! ## Firing Rules
//!
//! On a false → true flip exactly one of `Entered` / `EnteredUnreliable`
//! fires. `EnteredUnreliable` replaces `Entered` when reliability is required
//! and the verdict is negative; in that case the first `ProximityUpdate` is
//! suppressed as well. While proximity holds, every valid cycle fires a
//! `ProximityUpdate` when the verdict permits it.
//!
//! ## Payload Rendering
//!
//! Distances go out as whole meters, convergence speed with one decimal.
//! [`AdjacencyEvent::fields`] renders a payload as ordered key/value pairs for
//! sinks that do not speak serde.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use libm::round;

use crate::constants::defaults::{
    EVENT_ANY_ENTER, EVENT_ANY_LEAVE, EVENT_ENTER, EVENT_ENTER_UNRELIABLE, EVENT_LEAVE,
    EVENT_PROXIMITY_UPDATE,
};
use crate::errors::UnreliableReason;
use crate::subject::SubjectId;

/// Distance rounded to whole meters
pub fn whole_meters(distance_m: f64) -> i64 {
    round(distance_m) as i64
}

/// Value rounded to one decimal
pub fn one_decimal(value: f64) -> f64 {
    round(value * 10.0) / 10.0
}

/// Scalar payload value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum PayloadValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u32> for PayloadValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&SubjectId> for PayloadValue {
    fn from(v: &SubjectId) -> Self {
        Self::Text(v.as_str().to_string())
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<PayloadValue>> From<Option<T>> for PayloadValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Ordered key/value rendering of a payload
pub type PayloadFields = Vec<(&'static str, PayloadValue)>;

/// Payload of `Entered` and `EnteredUnreliable`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnterPayload {
    pub entity_a: SubjectId,
    pub entity_b: SubjectId,
    pub distance_m: i64,
    pub entry_threshold_m: f64,
    pub exit_threshold_m: f64,
    pub proximity_update_count: u32,
    pub proximity_reliable: bool,
    pub unreliable_reason: Option<String>,
    pub a_updates_in_window: u32,
    pub b_updates_in_window: u32,
    pub convergence_speed_kmh: Option<f64>,
}

/// Payload of `Left`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LeavePayload {
    pub entity_a: SubjectId,
    pub entity_b: SubjectId,
    pub distance_m: i64,
    pub entry_threshold_m: f64,
    pub exit_threshold_m: f64,
}

/// Payload of `ProximityUpdate`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProximityUpdatePayload {
    pub entity_a: SubjectId,
    pub entity_b: SubjectId,
    pub distance_m: i64,
    pub proximity_update_count: u32,
    pub is_first_update: bool,
    pub proximity_reliable: bool,
    pub unreliable_reason: Option<String>,
}

/// Payload of `AnyEntered` and `AnyLeft`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnyProximityPayload {
    pub anchor: SubjectId,
    pub any_proximity: bool,
    pub entry_threshold_m: f64,
    pub exit_threshold_m: f64,
    pub nearest_target: Option<SubjectId>,
    pub nearest_distance_m: Option<i64>,
}

/// Notification emitted by an engine or an anchor summary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AdjacencyEvent {
    Entered(EnterPayload),
    EnteredUnreliable(EnterPayload),
    Left(LeavePayload),
    ProximityUpdate(ProximityUpdatePayload),
    AnyEntered(AnyProximityPayload),
    AnyLeft(AnyProximityPayload),
}

impl AdjacencyEvent {
    /// Stable notification name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Entered(_) => EVENT_ENTER,
            Self::EnteredUnreliable(_) => EVENT_ENTER_UNRELIABLE,
            Self::Left(_) => EVENT_LEAVE,
            Self::ProximityUpdate(_) => EVENT_PROXIMITY_UPDATE,
            Self::AnyEntered(_) => EVENT_ANY_ENTER,
            Self::AnyLeft(_) => EVENT_ANY_LEAVE,
        }
    }

    /// Whether this is one of the enter notifications
    pub fn is_enter(&self) -> bool {
        matches!(self, Self::Entered(_) | Self::EnteredUnreliable(_) | Self::AnyEntered(_))
    }

    /// Payload as ordered key/value pairs
    pub fn fields(&self) -> PayloadFields {
        match self {
            Self::Entered(p) | Self::EnteredUnreliable(p) => vec![
                ("entity_a", (&p.entity_a).into()),
                ("entity_b", (&p.entity_b).into()),
                ("distance_m", p.distance_m.into()),
                ("entry_threshold_m", p.entry_threshold_m.into()),
                ("exit_threshold_m", p.exit_threshold_m.into()),
                ("proximity_update_count", p.proximity_update_count.into()),
                ("proximity_reliable", p.proximity_reliable.into()),
                ("unreliable_reason", p.unreliable_reason.as_deref().into()),
                ("a_updates_in_window", p.a_updates_in_window.into()),
                ("b_updates_in_window", p.b_updates_in_window.into()),
                ("convergence_speed_kmh", p.convergence_speed_kmh.into()),
            ],
            Self::Left(p) => vec![
                ("entity_a", (&p.entity_a).into()),
                ("entity_b", (&p.entity_b).into()),
                ("distance_m", p.distance_m.into()),
                ("entry_threshold_m", p.entry_threshold_m.into()),
                ("exit_threshold_m", p.exit_threshold_m.into()),
            ],
            Self::ProximityUpdate(p) => vec![
                ("entity_a", (&p.entity_a).into()),
                ("entity_b", (&p.entity_b).into()),
                ("distance_m", p.distance_m.into()),
                ("proximity_update_count", p.proximity_update_count.into()),
                ("is_first_update", p.is_first_update.into()),
                ("proximity_reliable", p.proximity_reliable.into()),
                ("unreliable_reason", p.unreliable_reason.as_deref().into()),
            ],
            Self::AnyEntered(p) | Self::AnyLeft(p) => vec![
                ("anchor", (&p.anchor).into()),
                ("any_proximity", p.any_proximity.into()),
                ("entry_threshold_m", p.entry_threshold_m.into()),
                ("exit_threshold_m", p.exit_threshold_m.into()),
                ("nearest_target", p.nearest_target.as_ref().into()),
                ("nearest_distance_m", p.nearest_distance_m.into()),
            ],
        }
    }
}

impl fmt::Display for AdjacencyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render an optional reliability reason the way payloads carry it
pub fn reason_text(reason: Option<UnreliableReason>) -> Option<String> {
    reason.map(|r| r.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Side;

    fn leave() -> AdjacencyEvent {
        AdjacencyEvent::Left(LeavePayload {
            entity_a: SubjectId::from("person.alice"),
            entity_b: SubjectId::from("person.bob"),
            distance_m: whole_meters(712.6),
            entry_threshold_m: 500.0,
            exit_threshold_m: 700.0,
        })
    }

    #[test]
    fn names() {
        assert_eq!(leave().name(), "member_adjacency_leave");
        assert!(!leave().is_enter());
    }

    #[test]
    fn leave_fields_are_ordered() {
        let fields = leave().fields();
        let keys: Vec<_> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["entity_a", "entity_b", "distance_m", "entry_threshold_m", "exit_threshold_m"]
        );
        assert_eq!(fields[2].1, PayloadValue::Int(713));
    }

    #[test]
    fn optional_fields_render_null() {
        let event = AdjacencyEvent::ProximityUpdate(ProximityUpdatePayload {
            entity_a: SubjectId::from("person.alice"),
            entity_b: SubjectId::from("person.bob"),
            distance_m: 120,
            proximity_update_count: 1,
            is_first_update: true,
            proximity_reliable: true,
            unreliable_reason: None,
        });
        let fields = event.fields();
        assert_eq!(fields.last(), Some(&("unreliable_reason", PayloadValue::Null)));
    }

    #[test]
    fn reason_text_keeps_counts() {
        let reason = UnreliableReason::InsufficientUpdates { side: Side::B, count: 1, required: 3 };
        assert_eq!(reason_text(Some(reason)).as_deref(), Some("insufficient_updates_b (1<3)"));
        assert_eq!(reason_text(None), None);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(whole_meters(499.5), 500);
        assert_eq!(one_decimal(450.04), 450.0);
        assert_eq!(one_decimal(12.36), 12.4);
    }
}
