//! Game objects and the per-mode arena

use std::collections::BTreeSet;

use serde::Serialize;

use super::{Action, GameMode, PlayerId};

/// Fields shared by every game object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBase {
    pub id: String,
    /// Spawn time, Unix seconds
    pub spawned_at: f64,
}

/// A falling pickup (Coin Cascade)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    #[serde(flatten)]
    pub base: ObjectBase,
    pub x: f64,
    /// Current height, recomputed from `spawn_y` every tick
    pub y: f64,
    #[serde(skip)]
    pub spawn_y: f64,
    pub gravity: f64,
}

/// A scrolling beat cue (Disco Dash)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowTarget {
    #[serde(flatten)]
    pub base: ObjectBase,
    pub action_type: Action,
    pub x: f64,
    /// Absolute beat time in milliseconds since mode start
    #[serde(rename = "time")]
    pub scheduled_ms: f64,
    pub hit_by: BTreeSet<PlayerId>,
    pub missed_by: BTreeSet<PlayerId>,
}

impl ArrowTarget {
    /// Whether this player already has a hit or miss on the target
    pub fn judged(&self, player: PlayerId) -> bool {
        self.hit_by.contains(&player) || self.missed_by.contains(&player)
    }
}

/// A horizontally moving hazard (Bullet Barrage)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    #[serde(flatten)]
    pub base: ObjectBase,
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    pub spawn_x: f64,
    pub speed: f64,
    pub scored_hits: BTreeSet<PlayerId>,
    pub scored_dodges: BTreeSet<PlayerId>,
}

impl Hazard {
    /// Whether this player already received a hit or dodge for the hazard
    pub fn credited(&self, player: PlayerId) -> bool {
        self.scored_hits.contains(&player) || self.scored_dodges.contains(&player)
    }
}

/// Wire form of any game object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameObject {
    Coin(Coin),
    Arrow(ArrowTarget),
    Hazard(Hazard),
}

/// Live objects of the active mode.
///
/// The variant doubles as the mode state machine: `Idle` until a mode is
/// selected, and a selection always starts from an empty arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Arena {
    #[default]
    Idle,
    CoinCascade(Vec<Coin>),
    DiscoDash(Vec<ArrowTarget>),
    BulletBarrage(Vec<Hazard>),
}

impl Arena {
    /// Empty arena for a freshly selected mode
    pub fn fresh(mode: GameMode) -> Self {
        match mode {
            GameMode::CoinCascade => Self::CoinCascade(Vec::new()),
            GameMode::DiscoDash => Self::DiscoDash(Vec::new()),
            GameMode::BulletBarrage => Self::BulletBarrage(Vec::new()),
        }
    }

    pub fn mode(&self) -> Option<GameMode> {
        match self {
            Self::Idle => None,
            Self::CoinCascade(_) => Some(GameMode::CoinCascade),
            Self::DiscoDash(_) => Some(GameMode::DiscoDash),
            Self::BulletBarrage(_) => Some(GameMode::BulletBarrage),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::CoinCascade(coins) => coins.len(),
            Self::DiscoDash(targets) => targets.len(),
            Self::BulletBarrage(hazards) => hazards.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the arena for broadcasting
    pub fn objects(&self) -> Vec<GameObject> {
        match self {
            Self::Idle => Vec::new(),
            Self::CoinCascade(coins) => coins.iter().cloned().map(GameObject::Coin).collect(),
            Self::DiscoDash(targets) => targets.iter().cloned().map(GameObject::Arrow).collect(),
            Self::BulletBarrage(hazards) => {
                hazards.iter().cloned().map(GameObject::Hazard).collect()
            }
        }
    }
}
