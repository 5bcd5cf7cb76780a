//! Session roster created by an `init` request

use std::ops::RangeInclusive;

use crate::game::PlayerId;

/// Largest roster an `init` may request
pub const MAX_PLAYERS: u32 = 64;

/// Roster for the current run. Replaced wholesale by each `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    num_players: u32,
    names: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("numPlayers must be at least 1")]
    NoPlayers,

    #[error("numPlayers {0} is out of range")]
    OutOfRange(i64),
}

impl Session {
    pub fn new(num_players: u32, names: Vec<String>) -> Result<Self, SessionError> {
        if num_players == 0 {
            return Err(SessionError::NoPlayers);
        }
        Ok(Self { num_players, names })
    }

    /// Validate an observer-supplied roster size
    pub fn from_request(num_players: i64, names: Vec<String>) -> Result<Self, SessionError> {
        if num_players < 1 {
            return Err(SessionError::NoPlayers);
        }
        match u32::try_from(num_players) {
            Ok(n) if n <= MAX_PLAYERS => Self::new(n, names),
            _ => Err(SessionError::OutOfRange(num_players)),
        }
    }

    pub fn num_players(&self) -> u32 {
        self.num_players
    }

    pub fn player_ids(&self) -> RangeInclusive<PlayerId> {
        1..=self.num_players
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.player_ids().contains(&player)
    }

    /// Explicit roster name, if the init supplied a non-empty one
    pub fn name_of(&self, player: PlayerId) -> Option<&str> {
        if !self.contains(player) {
            return None;
        }
        let index = usize::try_from(player).ok()?.checked_sub(1)?;
        self.names
            .get(index)
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
    }

    /// Display name with a `Player N` fallback
    pub fn display_name(&self, player: PlayerId) -> String {
        self.name_of(player)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Player {}", player))
    }
}
