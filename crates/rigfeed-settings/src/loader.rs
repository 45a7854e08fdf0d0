//! Settings loading: compiled defaults → JSON file → environment overrides.
//!
//! The file layer is deep-merged over the serialized defaults, so a partial
//! file only overrides the fields it names. Environment variables win over
//! everything; an unparseable override is logged and ignored rather than
//! failing the load.

use std::env;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{ExportMode, RigfeedSettings};

/// Settings file name, looked up in the current working directory.
pub const SETTINGS_FILE: &str = "rigfeed.json";

/// Environment variable overriding the listening port.
pub const ENV_PORT: &str = "RIGFEED_PORT";
/// Environment variable overriding the export mode.
pub const ENV_MODE: &str = "RIGFEED_MODE";

/// Default settings file path (`rigfeed.json` in the working directory).
pub fn settings_path() -> PathBuf {
    PathBuf::from(SETTINGS_FILE)
}

/// Load settings from the default path with env overrides applied.
pub fn load_settings() -> Result<RigfeedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env overrides applied.
///
/// A missing file is not an error — the file layer is simply skipped.
pub fn load_settings_from_path(path: &Path) -> Result<RigfeedSettings> {
    let mut settings = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        let overlay: Value =
            serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
                path: path.to_owned(),
                source,
            })?;
        let base = serde_json::to_value(RigfeedSettings::default()).unwrap_or_default();
        let merged = deep_merge(base, overlay);
        let settings =
            serde_json::from_value(merged).map_err(|source| SettingsError::Parse {
                path: path.to_owned(),
                source,
            })?;
        info!(?path, "loaded settings file");
        settings
    } else {
        info!(?path, "no settings file found, using defaults");
        RigfeedSettings::default()
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursively merge `overlay` into `base`. Objects merge key-by-key;
/// everything else is replaced by the overlay value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `RIGFEED_*` environment overrides in place.
fn apply_env_overrides(settings: &mut RigfeedSettings) {
    if let Ok(port) = env::var(ENV_PORT) {
        match port.parse::<u16>() {
            Ok(port) => settings.server.port = port,
            Err(_) => warn!(value = %port, "invalid {ENV_PORT}, keeping configured port"),
        }
    }
    if let Ok(mode) = env::var(ENV_MODE) {
        settings.export.mode = ExportMode::from_config(&mode);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
// Edition 2024 makes env mutation unsafe; guarded by ENV_MUTEX below.
#[allow(unsafe_code)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Tests that touch RIGFEED_* env vars must hold this lock — Rust runs
    /// tests in parallel threads and the environment is process-global.
    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn clear_env() {
        // Safety note: test-only; guarded by ENV_MUTEX.
        unsafe {
            env::remove_var(ENV_PORT);
            env::remove_var(ENV_MODE);
        }
    }

    #[test]
    fn deep_merge_overrides_leaves_and_keeps_siblings() {
        let base = json!({"server": {"port": 9995}, "export": {"mode": "full"}});
        let overlay = json!({"export": {"mode": "delta"}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["server"]["port"], 9995);
        assert_eq!(merged["export"]["mode"], "delta");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let settings =
            load_settings_from_path(Path::new("/nonexistent/rigfeed.json")).unwrap();
        assert_eq!(settings, RigfeedSettings::default());
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigfeed.json");
        std::fs::write(&path, r#"{"server": {"port": 7777}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.server.port, 7777);
        assert_eq!(settings.export.mode, ExportMode::Full);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigfeed.json");
        std::fs::write(&path, "port = 9995").unwrap();

        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn env_overrides_beat_the_file_layer() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rigfeed.json");
        std::fs::write(&path, r#"{"server": {"port": 7777}}"#).unwrap();

        unsafe {
            env::set_var(ENV_PORT, "8888");
            env::set_var(ENV_MODE, "devenv");
        }
        let settings = load_settings_from_path(&path).unwrap();
        clear_env();

        assert_eq!(settings.server.port, 8888);
        assert_eq!(settings.export.mode, ExportMode::Devenv);
    }

    #[test]
    fn invalid_env_port_is_ignored() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_PORT, "not-a-port");
        }
        let settings =
            load_settings_from_path(Path::new("/nonexistent/rigfeed.json")).unwrap();
        clear_env();

        assert_eq!(settings.server.port, 9995);
    }
}
