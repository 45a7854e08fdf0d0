//! # rigfeed-settings
//!
//! Configuration management with layered sources for the rigfeed relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`RigfeedSettings::default()`]
//! 2. **File** — `rigfeed.json` in the working directory (deep-merged over defaults)
//! 3. **Environment variables** — `RIGFEED_PORT` / `RIGFEED_MODE` (highest priority)
//!
//! Loading never fails the host: any error falls back to compiled defaults
//! with a logged warning. The global singleton is swappable so tests and
//! embedders can inject a known configuration.
//!
//! # Usage
//!
//! ```no_run
//! use rigfeed_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("listening port: {}", settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::{Arc, RwLock};

/// Global settings singleton.
///
/// `RwLock<Option<Arc<..>>>` rather than `OnceLock` so the cached value can
/// be replaced by [`init_settings`]. Reads are cheap (shared lock +
/// `Arc::clone`); writes only happen at startup and in tests.
static SETTINGS: RwLock<Option<Arc<RigfeedSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads from `rigfeed.json` with env overrides; afterwards
/// returns the cached value. Load failure falls back to compiled defaults.
///
/// Returns an `Arc` so callers hold a consistent snapshot even if another
/// thread replaces the settings concurrently.
pub fn get_settings() -> Arc<RigfeedSettings> {
    // Fast path: read lock
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    // Slow path: first access, take write lock
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    // Double-check after acquiring write lock (another thread may have initialized)
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            RigfeedSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialize the global settings with a specific value.
///
/// Replaces any previously cached settings. Used at startup once the
/// settings path is known, and by tests.
pub fn init_settings(settings: RigfeedSettings) {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::new(settings));
}

/// Reset the global settings cache (test-only).
#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that mutate the global SETTINGS static must hold this lock
    /// to avoid racing with each other (Rust runs tests in parallel threads).
    static SETTINGS_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn re_exports_work() {
        let _settings = RigfeedSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn init_settings_sets_custom_value() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        let mut custom = RigfeedSettings::default();
        custom.server.port = 9999;
        init_settings(custom);
        assert_eq!(get_settings().server.port, 9999);
        reset_settings();
    }

    #[test]
    fn init_settings_replaces_previous() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        let mut first = RigfeedSettings::default();
        first.server.port = 1111;
        init_settings(first);
        assert_eq!(get_settings().server.port, 1111);

        let mut second = RigfeedSettings::default();
        second.server.port = 2222;
        init_settings(second);
        assert_eq!(get_settings().server.port, 2222);
        reset_settings();
    }

    #[test]
    fn get_settings_returns_arc_for_snapshot_isolation() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        init_settings(RigfeedSettings::default());

        let snapshot = get_settings();
        assert_eq!(snapshot.server.port, 9995);

        let mut new = RigfeedSettings::default();
        new.server.port = 5555;
        init_settings(new);

        // Snapshot still sees the old value (Arc isolation)
        assert_eq!(snapshot.server.port, 9995);
        assert_eq!(get_settings().server.port, 5555);

        reset_settings();
    }
}
