//! Observer registry and broadcast fan-out

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Outbound frames buffered per observer before messages start dropping
pub const OBSERVER_QUEUE: usize = 256;

/// Serialized frame shared by every recipient of one broadcast
pub type Frame = Arc<str>;

/// Live observer handles, keyed by a per-connection id.
///
/// Each observer has a bounded queue drained by its own writer task, so a
/// stalled socket only ever backs up its own queue.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<Uuid, mpsc::Sender<Frame>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer and hand back the receiving end of its queue
    pub fn register(&self) -> (Uuid, mpsc::Receiver<Frame>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE);
        self.clients.insert(id, tx);
        debug!(client_id = %id, "Observer registered");
        (id, rx)
    }

    pub fn unregister(&self, id: Uuid) {
        if self.clients.remove(&id).is_some() {
            debug!(client_id = %id, "Observer unregistered");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Queue a message for one observer only
    pub fn send_to(&self, id: Uuid, msg: &ServerMsg) -> bool {
        let Some(frame) = encode(msg) else {
            return false;
        };
        let Some(tx) = self.clients.get(&id).map(|entry| entry.value().clone()) else {
            return false;
        };
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(client_id = %id, "Observer queue full, dropping reply");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(id);
                false
            }
        }
    }

    /// Serialize once and queue for every observer.
    ///
    /// Closed observers are evicted, full ones miss this message. Returns
    /// the number of observers the frame was queued for.
    pub fn broadcast(&self, msg: &ServerMsg) -> usize {
        let Some(frame) = encode(msg) else {
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for entry in self.clients.iter() {
            match entry.value().try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = %entry.key(), "Observer queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // removal happens after iteration; DashMap shards are still read-locked above
        for id in closed {
            self.unregister(id);
        }
        delivered
    }
}

fn encode(msg: &ServerMsg) -> Option<Frame> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!(error = %e, "Failed to serialize server message");
            None
        }
    }
}
