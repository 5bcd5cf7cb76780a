//! Player slot bookkeeping for hardware links

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;

use tokio::sync::oneshot;
use tracing::debug;

use crate::game::PlayerId;

/// Why a hardware connection was turned away
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmitError {
    #[error("No session configured")]
    NoSession,

    #[error("All {capacity} player slots are taken")]
    RosterFull { capacity: u32 },
}

/// A live hardware link bound to a slot
#[derive(Debug)]
struct LiveLink {
    link_id: u64,
    addr: SocketAddr,
    close_tx: Option<oneshot::Sender<()>>,
}

/// Result of a successful admission, handed to the link's reader task
#[derive(Debug)]
pub struct Admission {
    pub player: PlayerId,
    pub link_id: u64,
    pub close_rx: oneshot::Receiver<()>,
}

/// Slot table: at most one live link per player id.
///
/// A slot whose link drops stays vacant for the life of the table; ids are
/// handed out lowest-first and never recycled, even across re-inits.
#[derive(Debug, Default)]
pub struct SlotTable {
    live: BTreeMap<PlayerId, LiveLink>,
    vacated: BTreeSet<PlayerId>,
    next_link_id: u64,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new connection to the next free slot
    pub fn admit(&mut self, capacity: u32, addr: SocketAddr) -> Result<Admission, AdmitError> {
        let player = (1..=capacity)
            .find(|id| !self.live.contains_key(id) && !self.vacated.contains(id))
            .ok_or(AdmitError::RosterFull { capacity })?;

        self.next_link_id += 1;
        let link_id = self.next_link_id;
        let (close_tx, close_rx) = oneshot::channel();
        self.live.insert(
            player,
            LiveLink {
                link_id,
                addr,
                close_tx: Some(close_tx),
            },
        );

        Ok(Admission {
            player,
            link_id,
            close_rx,
        })
    }

    /// Remove a link that ended. Returns false if the slot is held by a
    /// different link (or none).
    pub fn release(&mut self, player: PlayerId, link_id: u64) -> bool {
        match self.live.get(&player) {
            Some(link) if link.link_id == link_id => {
                self.live.remove(&player);
                self.vacated.insert(player);
                true
            }
            _ => false,
        }
    }

    /// Ask a live link's reader to shut down
    pub fn close(&mut self, player: PlayerId) -> bool {
        let Some(link) = self.live.get_mut(&player) else {
            return false;
        };
        let Some(tx) = link.close_tx.take() else {
            return false;
        };
        debug!(player, addr = %link.addr, "Closing hardware link");
        tx.send(()).is_ok()
    }

    /// Close every live link whose id no longer fits the roster
    pub fn close_above(&mut self, capacity: u32) -> Vec<PlayerId> {
        let over: Vec<PlayerId> = self.live.range(capacity.saturating_add(1)..).map(|(id, _)| *id).collect();
        over.into_iter().filter(|id| self.close(*id)).collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
