//! # rigfeed-dispatch
//!
//! The producer-facing dispatcher: accepts channel updates and named events
//! on the producer's own thread, maintains the live-state store, and decides
//! at each frame boundary what to export (full snapshot, computed delta, or
//! throttled snapshot) based on the configured [`ExportMode`].
//!
//! Every entry point is synchronous and non-blocking — broadcasting is a
//! handoff to the server's fan-out queues, never a socket write.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use rigfeed_core::{EventClass, NamedEvent, TelemetryValue, channel_key};
use rigfeed_server::BroadcastServer;
use rigfeed_settings::ExportMode;
use rigfeed_state::TelemetryStore;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Minimum interval between exports in [`ExportMode::Devenv`].
const THROTTLE_INTERVAL: Duration = Duration::from_secs(1);

/// Gameplay events that terminate the current job.
const JOB_TERMINAL_EVENTS: [&str; 2] = ["job.delivered", "job.cancelled"];

/// State-key prefixes evicted when a job ends.
const JOB_EVICT_PREFIXES: [&str; 2] = ["job.", "cargo."];

/// Routes producer callbacks into the store and the broadcast server.
///
/// One instance per producer session; the export mode and session
/// identifier are fixed at construction. All methods are called from the
/// producer's thread and must never block or sleep.
pub struct TelemetryDispatcher {
    store: Arc<TelemetryStore>,
    server: Arc<BroadcastServer>,
    mode: ExportMode,
    /// Static session identifier stamped into every frame export
    /// (the `"game"` field on the wire).
    game_id: String,
    /// Last devenv-mode export instant; `None` until the first export.
    last_throttled: Mutex<Option<Instant>>,
}

impl TelemetryDispatcher {
    /// Create a dispatcher over an existing store and server.
    pub fn new(
        store: Arc<TelemetryStore>,
        server: Arc<BroadcastServer>,
        mode: ExportMode,
        game_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            server,
            mode,
            game_id: game_id.into(),
            last_throttled: Mutex::new(None),
        }
    }

    /// The configured export mode.
    pub fn mode(&self) -> ExportMode {
        self.mode
    }

    /// One channel update. Writes into the store only — never broadcasts.
    ///
    /// `index` distinguishes indexed channels (`name[index]`).
    pub fn report_scalar(&self, channel: &str, index: Option<u32>, value: TelemetryValue) {
        let key = channel_key(channel, index);
        let value = shape_channel_value(&key, value);
        self.store.set(&key, &value);
    }

    /// One named event.
    ///
    /// Configuration-class events merge each attribute into the store at
    /// `"{id}.{attribute}"`. Gameplay-class events bypass the store: they
    /// are serialized and queued immediately, and a job-terminal event
    /// additionally evicts all `job.` / `cargo.` state.
    pub fn report_event(&self, event: &NamedEvent) {
        match event.class {
            EventClass::Configuration => {
                for (name, value) in &event.attributes {
                    self.store.set(&format!("{}.{}", event.id, name), value);
                }
            }
            EventClass::Gameplay => {
                match serde_json::to_string(&gameplay_envelope(event)) {
                    Ok(json) => self.server.queue_broadcast(json),
                    Err(e) => warn!(event_id = %event.id, error = %e, "failed to serialize gameplay event"),
                }
                if JOB_TERMINAL_EVENTS.contains(&event.id.as_str()) {
                    debug!(event_id = %event.id, "job finished, clearing job state");
                    self.store.evict(&JOB_EVICT_PREFIXES);
                }
            }
        }
    }

    /// One producer tick. Applies the configured export policy.
    pub fn report_frame_boundary(&self) {
        match self.mode {
            ExportMode::Full => self.export_snapshot(),
            ExportMode::Delta => {
                let delta = self.store.diff_and_commit();
                // Silence is the correct output for an unchanged frame.
                if !delta.is_empty() {
                    self.broadcast_frame(delta);
                }
            }
            ExportMode::Devenv => {
                let now = Instant::now();
                {
                    let mut last = self.last_throttled.lock();
                    if last.is_some_and(|t| now.duration_since(t) < THROTTLE_INTERVAL) {
                        return;
                    }
                    *last = Some(now);
                }
                self.export_snapshot();
            }
        }
    }

    fn export_snapshot(&self) {
        self.broadcast_frame(self.store.snapshot());
    }

    /// Annotate a frame payload with the timestamp and session identifier,
    /// serialize it, and hand it to the fan-out queues.
    fn broadcast_frame(&self, mut frame: Map<String, Value>) {
        let _ = frame.insert("timestamp".to_owned(), Value::from(Utc::now().timestamp()));
        let _ = frame.insert("game".to_owned(), Value::from(self.game_id.clone()));
        match serde_json::to_string(&Value::Object(frame)) {
            Ok(json) => self.server.queue_broadcast(json),
            Err(e) => warn!(error = %e, "failed to serialize frame export"),
        }
    }
}

/// Unit shaping applied at ingestion.
///
/// `truck.speed` arrives in m/s and is exported in km/h, with a dead zone
/// below 0.1 m/s clamped to exactly zero to keep idle frames quiet.
fn shape_channel_value(key: &str, value: TelemetryValue) -> TelemetryValue {
    if key == "truck.speed" {
        if let TelemetryValue::F64(ms) = value {
            let shaped = if ms.abs() < 0.1 { 0.0 } else { ms * 3.6 };
            return TelemetryValue::F64(shaped);
        }
    }
    value
}

/// Build the one-shot wire envelope for a gameplay event.
///
/// The `attributes` key is omitted entirely when the event has none.
fn gameplay_envelope(event: &NamedEvent) -> Value {
    let mut envelope = Map::new();
    let _ = envelope.insert("type".to_owned(), Value::from("gameplay"));
    let _ = envelope.insert("event_name".to_owned(), Value::from(event.id.clone()));
    if !event.attributes.is_empty() {
        let attributes: Map<String, Value> = event
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let _ = envelope.insert("attributes".to_owned(), Value::Object(attributes));
    }
    Value::Object(envelope)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
