//! Server error types.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by [`crate::BroadcastServer::start`].
///
/// Everything past startup is recovered locally: per-connection transport
/// errors drop that connection and are never propagated to the broadcast
/// caller.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening endpoint could not be bound (port in use, permission).
    #[error("failed to bind broadcast listener on {addr}: {source}")]
    Bind {
        /// Address that failed to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
