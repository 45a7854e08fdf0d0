//! The [`TelemetryValue`] tagged union.
//!
//! One telemetry fact as reported by the producer, already normalized from
//! whatever native representation the producer uses. The JSON mapping is
//! fixed by the wire protocol: scalars map to JSON scalars, vectors to
//! `{x, y, z}`, placements to `{x, y, z, heading, pitch, roll}`, and objects
//! to plain JSON objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A single telemetry value.
///
/// Deserializes untagged, so replay input can write natural JSON
/// (`true`, `42`, `"text"`, `{"x":1,"y":2,"z":3}`). Variant order matters
/// for untagged matching: [`Placement`](Self::Placement) must come before
/// [`Vector`](Self::Vector) (a placement map would otherwise match the
/// vector variant, dropping its orientation fields), and
/// [`Object`](Self::Object) last because any map matches it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    /// Boolean flag (warning lamps, switches).
    Bool(bool),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Double-precision float.
    F64(f64),
    /// UTF-8 string.
    Text(String),
    /// Position plus orientation.
    Placement {
        /// World X coordinate.
        x: f64,
        /// World Y coordinate.
        y: f64,
        /// World Z coordinate.
        z: f64,
        /// Heading in game units.
        heading: f64,
        /// Pitch in game units.
        pitch: f64,
        /// Roll in game units.
        roll: f64,
    },
    /// 3-component vector (accelerations, angular velocity).
    Vector {
        /// X component.
        x: f64,
        /// Y component.
        y: f64,
        /// Z component.
        z: f64,
    },
    /// Nested object of values keyed by string.
    Object(BTreeMap<String, TelemetryValue>),
}

impl TelemetryValue {
    /// Convert into the wire-level JSON representation.
    ///
    /// Never fails: a non-finite float has no JSON number representation and
    /// becomes `null` instead of aborting the whole update.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::I64(n) => Value::Number(Number::from(*n)),
            Self::U64(n) => Value::Number(Number::from(*n)),
            Self::F64(f) => json_f64(*f),
            Self::Text(s) => Value::String(s.clone()),
            Self::Vector { x, y, z } => {
                let mut map = Map::new();
                let _ = map.insert("x".to_owned(), json_f64(*x));
                let _ = map.insert("y".to_owned(), json_f64(*y));
                let _ = map.insert("z".to_owned(), json_f64(*z));
                Value::Object(map)
            }
            Self::Placement {
                x,
                y,
                z,
                heading,
                pitch,
                roll,
            } => {
                let mut map = Map::new();
                let _ = map.insert("x".to_owned(), json_f64(*x));
                let _ = map.insert("y".to_owned(), json_f64(*y));
                let _ = map.insert("z".to_owned(), json_f64(*z));
                let _ = map.insert("heading".to_owned(), json_f64(*heading));
                let _ = map.insert("pitch".to_owned(), json_f64(*pitch));
                let _ = map.insert("roll".to_owned(), json_f64(*roll));
                Value::Object(map)
            }
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// JSON number from an `f64`; `null` for NaN/infinity.
fn json_f64(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
