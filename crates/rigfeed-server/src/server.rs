//! Listener lifecycle and the accept loop.
//!
//! `start` owns exactly one background task (the accept loop); each accepted
//! socket gets its own connection task inside a [`JoinSet`]. `stop` cancels
//! the loop, which closes every open connection with a Going Away status and
//! waits for the connection tasks — after `stop` returns, no further
//! network writes occur.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broadcast::BroadcastManager;
use crate::connection;
use crate::error::ServerError;

/// Back-off after a failed `accept` before retrying, so a persistent
/// error (fd exhaustion) cannot spin the loop.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// The observer-facing broadcast server.
///
/// Owns the connection registry and the background accept loop. All public
/// methods are safe to call from any thread or task;
/// [`queue_broadcast`](Self::queue_broadcast) in particular is synchronous
/// and never blocks on socket readiness.
pub struct BroadcastServer {
    manager: Arc<BroadcastManager>,
    running: Mutex<Option<Running>>,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl BroadcastServer {
    /// A stopped server with an empty registry.
    pub fn new() -> Self {
        Self {
            manager: Arc::new(BroadcastManager::new()),
            running: Mutex::new(None),
        }
    }

    /// The fan-out manager, for embedding and tests.
    pub fn manager(&self) -> &Arc<BroadcastManager> {
        &self.manager
    }

    /// Whether the accept loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Bound address while running (useful with port 0 in tests).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.local_addr)
    }

    /// Number of currently-connected observers.
    pub fn connection_count(&self) -> usize {
        self.manager.connection_count()
    }

    /// Bind `0.0.0.0:port` and spawn the accept loop.
    ///
    /// Idempotent: when already running this is a no-op returning the bound
    /// address. A bind failure is returned as a value — callers on the
    /// producer side log it and carry on without listeners.
    pub async fn start(&self, port: u16) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &*self.running.lock() {
            return Ok(running.local_addr);
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.manager),
            cancel.clone(),
        ));

        let mut guard = self.running.lock();
        if let Some(running) = &*guard {
            // Lost a concurrent start race: tear the fresh listener down.
            cancel.cancel();
            handle.abort();
            return Ok(running.local_addr);
        }
        *guard = Some(Running {
            cancel,
            handle,
            local_addr,
        });
        info!(%local_addr, "broadcast server listening");
        Ok(local_addr)
    }

    /// Stop the accept loop, close every connection with a Going Away
    /// status, and release the listening endpoint.
    ///
    /// Idempotent and safe from any task. After this returns, no further
    /// network writes occur.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else { return };
        info!("stopping broadcast server");
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            warn!(error = %e, "accept loop task failed during shutdown");
        }
        info!("broadcast server stopped");
    }

    /// Queue one serialized message for every currently-connected observer.
    ///
    /// Returns immediately; never blocks the caller and never raises.
    /// With no observers connected the message is silently dropped at
    /// fan-out, which is the documented fire-and-forget contract.
    pub fn queue_broadcast(&self, message: String) {
        self.manager.broadcast(message);
    }
}

impl Default for BroadcastServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept observers until cancelled, then drain every connection task.
async fn accept_loop(
    listener: TcpListener,
    manager: Arc<BroadcastManager>,
    cancel: CancellationToken,
) {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let _ = connections.spawn(connection::serve_connection(
                        stream,
                        addr,
                        Arc::clone(&manager),
                        cancel.child_token(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },
            // Reap finished connection tasks so the set stays bounded.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
    // Release the port before waiting on connection shutdown.
    drop(listener);
    // Every connection task observes the cancelled child token, sends its
    // close frame, and exits; joining them here is what lets `stop`
    // guarantee no writes after it returns.
    while connections.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn start_is_idempotent() {
        let server = BroadcastServer::new();
        let first = server.start(0).await.unwrap();
        let second = server.start(0).await.unwrap();
        assert_eq!(first, second);
        server.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_safe_when_never_started() {
        let server = BroadcastServer::new();
        server.stop().await;
        let _ = server.start(0).await.unwrap();
        server.stop().await;
        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error_not_a_panic() {
        let first = BroadcastServer::new();
        let addr = first.start(0).await.unwrap();

        let second = BroadcastServer::new();
        let err = second.start(addr.port()).await.unwrap_err();
        assert_matches!(err, ServerError::Bind { .. });

        first.stop().await;
    }

    #[tokio::test]
    async fn restart_after_stop_rebinds() {
        let server = BroadcastServer::new();
        let addr = server.start(0).await.unwrap();
        server.stop().await;
        let again = server.start(addr.port()).await.unwrap();
        assert_eq!(again.port(), addr.port());
        server.stop().await;
    }

    #[tokio::test]
    async fn queue_broadcast_without_observers_is_a_noop() {
        let server = BroadcastServer::new();
        server.queue_broadcast("m".to_owned());
        assert_eq!(server.connection_count(), 0);
    }
}
