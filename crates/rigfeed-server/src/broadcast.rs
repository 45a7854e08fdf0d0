//! Message fan-out to connected observers.
//!
//! The registry is guarded by its own lock, independent of each
//! connection's outbound queue, so enqueueing a broadcast never couples the
//! producer path to connection I/O. Removal happens in the connection task
//! itself; a send into a closed queue here just skips that observer.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::connection::ClientConnection;
use crate::metrics::{WS_BROADCAST_SKIPS_TOTAL, WS_BROADCASTS_TOTAL};

/// Manages the observer registry and message fan-out.
///
/// All methods are synchronous and non-blocking; [`broadcast`](Self::broadcast)
/// is safe to call from the producer thread.
pub struct BroadcastManager {
    /// Connected observers indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic counter tracking total connections (avoids read-locking for count queries).
    active_count: AtomicUsize,
}

impl BroadcastManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Add a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write();
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection by ID.
    pub fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write();
        if conns.remove(connection_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Queue one serialized message for every currently-registered observer.
    ///
    /// Serialize-once: the message is shared by `Arc` across all queues.
    /// Returns immediately; an observer whose connection task already exited
    /// is skipped without error, and delivery order per observer matches
    /// call order.
    pub fn broadcast(&self, message: String) {
        let shared = Arc::new(message);
        let conns = self.connections.read();
        counter!(WS_BROADCASTS_TOTAL).increment(1);
        if conns.is_empty() {
            trace!("no observers connected, message dropped at fan-out");
            return;
        }
        let mut delivered = 0_usize;
        for conn in conns.values() {
            if conn.send(Arc::clone(&shared)) {
                delivered += 1;
            } else {
                counter!(WS_BROADCAST_SKIPS_TOTAL).increment(1);
                debug!(conn_id = %conn.id, "observer queue closed, skipped");
            }
        }
        trace!(delivered, observers = conns.len(), "broadcast queued");
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn make_connection_with_rx(
        id: &str,
    ) -> (Arc<ClientConnection>, mpsc::UnboundedReceiver<Arc<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ClientConnection::new(id.into(), "127.0.0.1:0".parse().unwrap(), tx);
        (Arc::new(conn), rx)
    }

    #[tokio::test]
    async fn add_connection() {
        let bm = BroadcastManager::new();
        let (conn, _rx) = make_connection_with_rx("c1");
        bm.add(conn);
        assert_eq!(bm.connection_count(), 1);
    }

    #[tokio::test]
    async fn remove_connection() {
        let bm = BroadcastManager::new();
        let (conn, _rx) = make_connection_with_rx("c1");
        bm.add(conn);
        bm.remove("c1");
        assert_eq!(bm.connection_count(), 0);
    }

    #[tokio::test]
    async fn remove_nonexistent_connection() {
        let bm = BroadcastManager::new();
        bm.remove("no_such");
        assert_eq!(bm.connection_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_observer() {
        let bm = BroadcastManager::new();
        let (c1, mut rx1) = make_connection_with_rx("c1");
        let (c2, mut rx2) = make_connection_with_rx("c2");
        let (c3, mut rx3) = make_connection_with_rx("c3");
        bm.add(c1);
        bm.add(c2);
        bm.add(c3);

        bm.broadcast(r#"{"truck":{"speed":80.0}}"#.to_owned());

        for rx in [&mut rx1, &mut rx2, &mut rx3] {
            assert_eq!(*rx.try_recv().unwrap(), r#"{"truck":{"speed":80.0}}"#);
        }
    }

    #[tokio::test]
    async fn broadcast_preserves_queue_order() {
        let bm = BroadcastManager::new();
        let (conn, mut rx) = make_connection_with_rx("c1");
        bm.add(conn);

        bm.broadcast("first".to_owned());
        bm.broadcast("second".to_owned());
        bm.broadcast("third".to_owned());

        assert_eq!(*rx.try_recv().unwrap(), "first");
        assert_eq!(*rx.try_recv().unwrap(), "second");
        assert_eq!(*rx.try_recv().unwrap(), "third");
    }

    #[tokio::test]
    async fn dead_observer_does_not_abort_delivery_to_others() {
        let bm = BroadcastManager::new();
        let (dead, dead_rx) = make_connection_with_rx("dead");
        let (live, mut live_rx) = make_connection_with_rx("live");
        drop(dead_rx); // connection task gone
        bm.add(dead);
        bm.add(live);

        bm.broadcast("m".to_owned());

        assert_eq!(*live_rx.try_recv().unwrap(), "m");
    }

    #[tokio::test]
    async fn broadcast_to_empty_manager_is_a_noop() {
        let bm = BroadcastManager::new();
        // Must not panic or block.
        bm.broadcast("m".to_owned());
    }

    #[tokio::test]
    async fn add_connection_overwrites_same_id() {
        let bm = BroadcastManager::new();
        let (c1, _rx1) = make_connection_with_rx("same_id");
        let (c2, mut rx2) = make_connection_with_rx("same_id");
        bm.add(c1);
        bm.add(c2);
        assert_eq!(bm.connection_count(), 1);

        bm.broadcast("m".to_owned());
        assert_eq!(*rx2.try_recv().unwrap(), "m");
    }

    #[tokio::test]
    async fn broadcast_arc_shared_not_cloned() {
        let bm = BroadcastManager::new();
        let (c1, mut rx1) = make_connection_with_rx("c1");
        let (c2, mut rx2) = make_connection_with_rx("c2");
        bm.add(c1);
        bm.add(c2);

        bm.broadcast("shared".to_owned());

        let m1 = rx1.recv().await.unwrap();
        let m2 = rx2.recv().await.unwrap();
        // Both receivers share the same allocation.
        assert!(Arc::ptr_eq(&m1, &m2));
        assert_eq!(&*m1, "shared");
    }

    #[tokio::test]
    async fn connection_count_consistent_after_add_remove_overwrite() {
        let bm = BroadcastManager::new();
        let (c1, _rx1) = make_connection_with_rx("c1");
        let (c2, _rx2) = make_connection_with_rx("c2");
        let (c1_dup, _rx3) = make_connection_with_rx("c1");
        bm.add(c1);
        bm.add(c2);
        // Overwrite c1 — count stays 2.
        bm.add(c1_dup);
        assert_eq!(bm.connection_count(), 2);
        bm.remove("c1");
        assert_eq!(bm.connection_count(), 1);
        bm.remove("c2");
        assert_eq!(bm.connection_count(), 0);
    }

    #[test]
    fn default_manager_is_empty() {
        assert_eq!(BroadcastManager::default().connection_count(), 0);
    }
}
