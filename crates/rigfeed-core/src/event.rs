//! Discrete named events reported by the producer.
//!
//! Two classes exist, and they flow through completely different paths:
//! configuration events are merged into the live state tree under
//! `"{event_id}.{attribute}"` keys, while gameplay events are one-shot
//! messages broadcast immediately and never stored.

use serde::{Deserialize, Serialize};

use crate::value::TelemetryValue;

/// How an event is routed by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
    /// Persistent state: attributes merge into the store like channel writes.
    Configuration,
    /// One-shot: serialized and broadcast directly, bypassing the store.
    Gameplay,
}

/// A named event with its ordered attribute list.
///
/// Attribute order is preserved as reported by the producer; attribute
/// names are unique within one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedEvent {
    /// Event identifier, e.g. `job` (configuration) or `job.delivered` (gameplay).
    pub id: String,
    /// Routing class.
    pub class: EventClass,
    /// Ordered `(name, value)` attribute pairs.
    #[serde(default)]
    pub attributes: Vec<(String, TelemetryValue)>,
}

impl NamedEvent {
    /// A configuration-class event.
    pub fn configuration(
        id: impl Into<String>,
        attributes: Vec<(String, TelemetryValue)>,
    ) -> Self {
        Self {
            id: id.into(),
            class: EventClass::Configuration,
            attributes,
        }
    }

    /// A gameplay-class (one-shot) event.
    pub fn gameplay(id: impl Into<String>, attributes: Vec<(String, TelemetryValue)>) -> Self {
        Self {
            id: id.into(),
            class: EventClass::Gameplay,
            attributes,
        }
    }
}
