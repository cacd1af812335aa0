//! Fan-out of wire messages to connected observers.
//!
//! Each observer owns a bounded queue drained by its WebSocket writer task.
//! An observer whose queue is closed or full is pruned after the pass that
//! found it; there is no separate keepalive sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::errors::ServerError;
use crate::messages::WireMessage;

pub type ObserverId = u64;

pub struct BroadcastHub {
    next_id: AtomicU64,
    buffer: usize,
    observers: RwLock<HashMap<ObserverId, mpsc::Sender<Arc<str>>>>,
}

impl BroadcastHub {
    /// `buffer` is the per-observer queue depth and must be > 0.
    pub fn new(buffer: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Register an observer. `initial` is queued before anything broadcast
    /// afterwards.
    pub async fn connect(
        &self,
        initial: &WireMessage,
    ) -> Result<(ObserverId, mpsc::Receiver<Arc<str>>), ServerError> {
        let payload: Arc<str> = serde_json::to_string(initial)?.into();
        let (tx, rx) = mpsc::channel(self.buffer);
        // Fresh channel with capacity >= 1, cannot be full or closed.
        let _ = tx.try_send(payload);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, tx);
            observers.len()
        };
        info!(event = "server.hub.observer_connected", observer = id, observers = count);
        Ok((id, rx))
    }

    pub async fn disconnect(&self, id: ObserverId) {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            info!(event = "server.hub.observer_disconnected", observer = id);
        }
    }

    /// Serialize once and queue to every observer. Returns how many accepted it.
    pub async fn broadcast(&self, message: &WireMessage) -> usize {
        let payload: Arc<str> = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(event = "server.hub.serialize_failed", kind = message.kind(), error = %e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let observers = self.observers.read().await;
            for (id, tx) in observers.iter() {
                match tx.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Closed(_)) => dead.push((*id, "closed")),
                    Err(TrySendError::Full(_)) => dead.push((*id, "stalled")),
                }
            }
        }

        if !dead.is_empty() {
            let mut observers = self.observers.write().await;
            for (id, reason) in dead {
                observers.remove(&id);
                info!(event = "server.hub.observer_pruned", observer = id, reason = reason);
            }
        }

        debug!(
            event = "server.hub.broadcast_completed",
            kind = message.kind(),
            delivered = delivered
        );
        delivered
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Drop every observer queue so writer tasks finish and sockets close.
    pub async fn close_all(&self) {
        let mut observers = self.observers.write().await;
        let count = observers.len();
        observers.clear();
        if count > 0 {
            info!(event = "server.hub.observers_closed", observers = count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewview_teams::TeamStats;

    fn update() -> WireMessage {
        WireMessage::TeamsUpdate {
            data: Vec::new(),
            stats: TeamStats::default(),
        }
    }

    fn outputs() -> WireMessage {
        WireMessage::AgentOutputsUpdate {
            outputs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_initial_message_arrives_first() {
        let hub = BroadcastHub::new(8);
        let (_id, mut rx) = hub.connect(&outputs()).await.unwrap();
        hub.broadcast(&update()).await;

        let first = rx.recv().await.unwrap();
        assert!(first.contains("agent_outputs_update"));
        let second = rx.recv().await.unwrap();
        assert!(second.contains("teams_update"));
    }

    #[tokio::test]
    async fn test_disconnected_observer_pruned() {
        let hub = BroadcastHub::new(8);
        let (_a, mut rx_a) = hub.connect(&outputs()).await.unwrap();
        let (_b, rx_b) = hub.connect(&outputs()).await.unwrap();
        let (_c, mut rx_c) = hub.connect(&outputs()).await.unwrap();
        drop(rx_b);

        let delivered = hub.broadcast(&update()).await;
        assert_eq!(delivered, 2);
        assert_eq!(hub.observer_count().await, 2);

        for rx in [&mut rx_a, &mut rx_c] {
            let _initial = rx.recv().await.unwrap();
            assert!(rx.recv().await.unwrap().contains("teams_update"));
        }
    }

    #[tokio::test]
    async fn test_stalled_observer_pruned() {
        let hub = BroadcastHub::new(1);
        let (_id, _rx) = hub.connect(&outputs()).await.unwrap();
        // Queue already holds the initial message.
        assert_eq!(hub.broadcast(&update()).await, 0);
        assert_eq!(hub.observer_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_and_close_all() {
        let hub = BroadcastHub::new(4);
        let (a, _rx_a) = hub.connect(&outputs()).await.unwrap();
        let (_b, mut rx_b) = hub.connect(&outputs()).await.unwrap();
        hub.disconnect(a).await;
        assert_eq!(hub.observer_count().await, 1);

        hub.close_all().await;
        assert_eq!(hub.observer_count().await, 0);
        let _initial = rx_b.recv().await.unwrap();
        assert!(rx_b.recv().await.is_none());
    }
}
