//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial settings file is valid — missing fields get their compiled
//! default during deserialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default listening port for the broadcast server.
pub const DEFAULT_PORT: u16 = 9995;

/// Root settings type for the rigfeed relay.
///
/// # JSON Format
///
/// ```json
/// {
///   "server": { "port": 9995 },
///   "export": { "mode": "delta" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RigfeedSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Broadcast server network settings.
    pub server: ServerSettings,
    /// Per-frame export settings.
    pub export: ExportSettings,
}

impl Default for RigfeedSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_owned(),
            name: "rigfeed".to_owned(),
            server: ServerSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

/// Broadcast server network settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// WebSocket listening port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Per-frame export settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Which export policy the dispatcher applies at each frame boundary.
    pub mode: ExportMode,
}

/// Export policy, fixed at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Full snapshot every frame boundary.
    #[default]
    Full,
    /// Minimal delta since the last export; silence when nothing changed.
    Delta,
    /// Full snapshot, rate-limited to one per second (development mode).
    Devenv,
}

impl ExportMode {
    /// Parse a configured mode string, falling back to [`ExportMode::Full`]
    /// with a warning on anything unrecognized.
    pub fn from_config(s: &str) -> Self {
        s.parse().unwrap_or_else(|()| {
            tracing::warn!(mode = s, "unknown export mode, falling back to full");
            Self::Full
        })
    }
}

impl FromStr for ExportMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "delta" => Ok(Self::Delta),
            "devenv" => Ok(Self::Devenv),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Full => "full",
            Self::Delta => "delta",
            Self::Devenv => "devenv",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = RigfeedSettings::default();
        assert_eq!(settings.name, "rigfeed");
        assert_eq!(settings.server.port, 9995);
        assert_eq!(settings.export.mode, ExportMode::Full);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: RigfeedSettings =
            serde_json::from_str(r#"{"export": {"mode": "delta"}}"#).unwrap();
        assert_eq!(settings.export.mode, ExportMode::Delta);
        assert_eq!(settings.server.port, 9995);
    }

    #[test]
    fn mode_round_trips_through_display() {
        for mode in [ExportMode::Full, ExportMode::Delta, ExportMode::Devenv] {
            assert_eq!(ExportMode::from_config(&mode.to_string()), mode);
        }
    }

    #[test]
    fn unknown_mode_falls_back_to_full() {
        assert_eq!(ExportMode::from_config("default_fallback"), ExportMode::Full);
        assert_eq!(ExportMode::from_config(""), ExportMode::Full);
    }
}
