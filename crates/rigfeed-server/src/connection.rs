//! Per-connection state and the connection task.
//!
//! Each accepted socket gets one task that completes the WebSocket
//! handshake, sends the greeting, then services two sources concurrently:
//! the connection's outbound queue (messages fanned out by
//! [`BroadcastManager`](crate::BroadcastManager)) and inbound frames from
//! the observer. The protocol is unidirectional — inbound frames beyond
//! close handling are received and discarded.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broadcast::BroadcastManager;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Greeting payload sent to every observer immediately after the handshake.
pub const GREETING: &str = r#"{"welcome":"ok"}"#;

/// One observer's transport session.
///
/// Owned by the broadcast manager for its lifetime; registry membership is
/// the sole authority for "is this observer reachable now". Holds the send
/// half of the connection's unbounded outbound queue — the queue never
/// applies backpressure to the producer path and never drops an accepted
/// message while the connection task is alive.
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique connection ID (UUID v7).
    pub id: String,
    /// Peer address, for logging.
    pub addr: SocketAddr,
    sender: mpsc::UnboundedSender<Arc<String>>,
}

impl ClientConnection {
    /// Create a connection handle around an outbound queue sender.
    pub fn new(id: String, addr: SocketAddr, sender: mpsc::UnboundedSender<Arc<String>>) -> Self {
        Self { id, addr, sender }
    }

    /// Queue one serialized message for this observer.
    ///
    /// Returns `false` when the connection task has already exited (the
    /// observer is gone); the caller skips it and carries on.
    pub fn send(&self, message: Arc<String>) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// Drive one observer connection to completion.
///
/// Handshake → greeting → register → service queue and inbound frames →
/// deregister. On cancellation a Going Away close frame is sent before the
/// task exits, so awaiting this task guarantees no further writes.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    manager: Arc<BroadcastManager>,
    cancel: CancellationToken,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%addr, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    // Greeting goes to this connection only, before it can see broadcasts.
    if let Err(e) = sink.send(Message::text(GREETING)).await {
        debug!(%addr, error = %e, "failed to send greeting");
        return;
    }

    let (tx, mut outbound) = mpsc::unbounded_channel::<Arc<String>>();
    let conn = Arc::new(ClientConnection::new(
        Uuid::now_v7().to_string(),
        addr,
        tx,
    ));
    let conn_id = conn.id.clone();
    manager.add(conn);
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    debug!(conn_id = %conn_id, %addr, "observer connected");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let close = Message::Close(Some(CloseFrame {
                    code: CloseCode::Away,
                    reason: "server shutdown".into(),
                }));
                if let Err(e) = sink.send(close).await {
                    debug!(conn_id = %conn_id, error = %e, "close frame failed");
                }
                break;
            }
            queued = outbound.recv() => {
                let Some(message) = queued else { break };
                if let Err(e) = sink.send(Message::text((*message).clone())).await {
                    debug!(conn_id = %conn_id, error = %e, "send failed, dropping observer");
                    break;
                }
            }
            inbound = source.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    // Unidirectional protocol: inbound frames are discarded.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    manager.remove(&conn_id);
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    debug!(conn_id = %conn_id, "observer disconnected");
}
