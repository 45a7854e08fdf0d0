//! Metric name constants to avoid typos across modules.
//!
//! Recorded via the `metrics` facade; without an installed recorder these
//! are no-ops, so embedding hosts opt in to exporting.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Broadcast messages queued total (counter).
pub const WS_BROADCASTS_TOTAL: &str = "ws_broadcasts_total";
/// Broadcast deliveries skipped because the observer was gone (counter).
pub const WS_BROADCAST_SKIPS_TOTAL: &str = "ws_broadcast_skips_total";
