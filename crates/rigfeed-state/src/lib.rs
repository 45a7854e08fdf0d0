//! # rigfeed-state
//!
//! Thread-safe live-state tree with path-addressed writes, full-snapshot
//! reads, delta computation, and prefix eviction.
//!
//! The store keeps two trees: `current` (the latest known value for every
//! key ever set) and `last_exported` (the snapshot taken by the most recent
//! [`TelemetryStore::diff_and_commit`]). All operations serialize on one
//! mutex; callers see each path write as atomic — no observer can read a
//! partially-constructed nested object.

#![deny(unsafe_code)]

mod diff;
mod path;

use std::collections::BTreeSet;

use parking_lot::Mutex;
use rigfeed_core::TelemetryValue;
use serde_json::{Map, Value};
use tracing::debug;

/// The merged live-state tree.
///
/// Writes are last-writer-wins; the total order across distinct keys is
/// undefined, but every individual operation is atomic with respect to the
/// others.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    current: Map<String, Value>,
    last_exported: Map<String, Value>,
    /// Original dotted keys, kept for prefix eviction: eviction matches on
    /// the key string as reported by the producer, before any path-splitting.
    dotted_keys: BTreeSet<String>,
}

impl TelemetryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` at the dot-separated `key`, creating intermediate
    /// nested objects as needed. Never fails.
    pub fn set(&self, key: &str, value: &TelemetryValue) {
        let json = value.to_json();
        let mut inner = self.inner.lock();
        path::set_path(&mut inner.current, key, json);
        if !inner.dotted_keys.contains(key) {
            let _ = inner.dotted_keys.insert(key.to_owned());
        }
    }

    /// Deep point-in-time copy of the current tree.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.lock().current.clone()
    }

    /// Compute the minimal structural difference since the last export and
    /// commit the current tree as the new export baseline, atomically.
    ///
    /// The diff is asymmetric: deleted keys are not reported (see
    /// full-snapshot mode for deletion visibility). Two consecutive calls
    /// with no intervening writes yield an empty second result.
    pub fn diff_and_commit(&self) -> Map<String, Value> {
        let mut inner = self.inner.lock();
        let delta = diff::diff_maps(&inner.last_exported, &inner.current);
        inner.last_exported = inner.current.clone();
        delta
    }

    /// Remove every key whose original dotted form starts with any of
    /// `prefixes`, pruning nested objects the removal empties.
    pub fn evict(&self, prefixes: &[&str]) {
        let StoreInner {
            current,
            dotted_keys,
            ..
        } = &mut *self.inner.lock();
        let before = dotted_keys.len();
        dotted_keys.retain(|key| {
            let doomed = prefixes.iter().any(|p| key.starts_with(p));
            if doomed {
                let _ = path::remove_path(current, key);
            }
            !doomed
        });
        debug!(
            evicted = before - dotted_keys.len(),
            ?prefixes,
            "evicted state keys"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
