//! Input aggregation: latest positions plus a FIFO of discrete actions

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;

use crate::game::{InputEvent, PlayerId, PlayerPosition};

/// Merges position updates and action events from every transport.
///
/// Positions are last-write-wins per player. Actions queue in arrival order
/// and are drained as a whole once per tick.
#[derive(Debug, Default)]
pub struct InputAggregator {
    positions: Mutex<BTreeMap<PlayerId, PlayerPosition>>,
    queue: Mutex<VecDeque<InputEvent>>,
}

impl InputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, player: PlayerId, position: PlayerPosition) {
        self.positions.lock().insert(player, position);
    }

    pub fn push_input(&self, event: InputEvent) {
        self.queue.lock().push_back(event);
    }

    /// Copy of all known positions
    pub fn positions(&self) -> BTreeMap<PlayerId, PlayerPosition> {
        self.positions.lock().clone()
    }

    /// Take every queued event, leaving the queue empty
    pub fn drain(&self) -> Vec<InputEvent> {
        self.queue.lock().drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn clear_queue(&self) {
        self.queue.lock().clear();
    }

    /// Forget positions and queued events (new roster)
    pub fn reset(&self) {
        self.positions.lock().clear();
        self.clear_queue();
    }
}
