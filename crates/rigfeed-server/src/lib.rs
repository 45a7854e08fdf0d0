//! # rigfeed-server
//!
//! WebSocket broadcast server for the rigfeed telemetry relay.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `server` | Listener lifecycle: `start` / `stop`, accept loop |
//! | `connection` | Per-connection greeting, outbound queue drain, inbound discard |
//! | `broadcast` | Fan-out manager: connection registry, serialize-once delivery |
//! | `error` | `ServerError` for bind/startup failures |
//! | `metrics` | Metric name constants |
//!
//! ## Data Flow
//!
//! The dispatcher calls [`BroadcastServer::queue_broadcast`] synchronously
//! from the producer thread; the message lands on each connection's
//! unbounded outbound queue and is written by that connection's own task.
//! The producer path never touches a socket.

#![deny(unsafe_code)]

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod server;

pub use broadcast::BroadcastManager;
pub use connection::{ClientConnection, GREETING};
pub use error::ServerError;
pub use server::BroadcastServer;
