//! Game-mode simulators
//!
//! Each simulator is a pure step function over `(arena, positions, inputs,
//! now)` that returns the next arena and records score changes in a
//! [`TickOutcome`]. The engine owns the arena and applies the outcome.

pub mod arena;
pub mod barrage;
pub mod coin;
pub mod disco;
pub mod kinematics;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use arena::{Arena, ArrowTarget, Coin, GameObject, Hazard, ObjectBase};
pub use barrage::{BarrageConfig, BulletBarrage};
pub use coin::{CoinCascade, CoinConfig};
pub use disco::{Beat, Beatmap, DiscoConfig, DiscoDash};

/// Player slot number, `1..=numPlayers`
pub type PlayerId = u32;

/// Selectable game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "Coin Cascade", alias = "CoinCascade")]
    CoinCascade,
    #[serde(rename = "Disco Dash", alias = "DiscoDash")]
    DiscoDash,
    #[serde(rename = "Bullet Barrage", alias = "BulletBarrage")]
    BulletBarrage,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoinCascade => "Coin Cascade",
            Self::DiscoDash => "Disco Dash",
            Self::BulletBarrage => "Bullet Barrage",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown game mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for GameMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Coin Cascade" | "CoinCascade" => Ok(Self::CoinCascade),
            "Disco Dash" | "DiscoDash" => Ok(Self::DiscoDash),
            "Bullet Barrage" | "BulletBarrage" => Ok(Self::BulletBarrage),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Semantic input action.
///
/// Browser clients send key names (`ArrowUp`), controllers send tokens that
/// the hardware token table maps onto the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "Button", alias = "button1")]
    ButtonOne,
    #[serde(rename = "Button2", alias = "button2")]
    ButtonTwo,
    #[serde(rename = "ArrowUp", alias = "jump")]
    Jump,
    #[serde(rename = "ArrowLeft", alias = "left")]
    Left,
    #[serde(rename = "ArrowRight", alias = "right")]
    Right,
    #[serde(rename = "Neutral", alias = "neutral")]
    Neutral,
}

impl Action {
    /// Name used in hardware token tables
    pub fn hardware_name(&self) -> &'static str {
        match self {
            Self::ButtonOne => "button1",
            Self::ButtonTwo => "button2",
            Self::Jump => "jump",
            Self::Left => "left",
            Self::Right => "right",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "button1" | "Button" => Ok(Self::ButtonOne),
            "button2" | "Button2" => Ok(Self::ButtonTwo),
            "jump" | "ArrowUp" => Ok(Self::Jump),
            "left" | "ArrowLeft" => Ok(Self::Left),
            "right" | "ArrowRight" => Ok(Self::Right),
            "neutral" | "still" | "Neutral" => Ok(Self::Neutral),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Last reported position of a player (last write wins)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPosition {
    pub x: f64,
    pub y: f64,
    /// Client send time in Unix milliseconds, used for latency logging
    #[serde(rename = "sentAt", default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<f64>,
}

/// A discrete action queued for the next tick
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub player: PlayerId,
    pub action: Action,
    /// Client-supplied timestamp (milliseconds); informational only
    pub client_timestamp: f64,
}

/// Judgement attached to rhythm feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Judgement {
    Perfect,
    Good,
    Miss,
}

impl Judgement {
    pub fn points(&self) -> i64 {
        match self {
            Self::Perfect => 2,
            Self::Good => 1,
            Self::Miss => -1,
        }
    }
}

/// Why a score changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreReason {
    Collected,
    Judged(Judgement),
    HazardHit,
    HazardDodged,
}

/// A single score change produced by a simulator
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDelta {
    pub player: PlayerId,
    pub points: i64,
    pub reason: ScoreReason,
}

/// Scoring side effects of one tick
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub deltas: Vec<ScoreDelta>,
}

impl TickOutcome {
    pub fn credit(&mut self, player: PlayerId, points: i64, reason: ScoreReason) {
        self.deltas.push(ScoreDelta {
            player,
            points,
            reason,
        });
    }

    pub fn judge(&mut self, player: PlayerId, judgement: Judgement) {
        self.credit(player, judgement.points(), ScoreReason::Judged(judgement));
    }

    /// Rhythm judgements in the order they were made
    pub fn judgements(&self) -> impl Iterator<Item = (PlayerId, Judgement)> + '_ {
        self.deltas.iter().filter_map(|d| match d.reason {
            ScoreReason::Judged(j) => Some((d.player, j)),
            _ => None,
        })
    }

    /// Net points per player for this tick
    pub fn totals(&self) -> BTreeMap<PlayerId, i64> {
        let mut totals = BTreeMap::new();
        for delta in &self.deltas {
            *totals.entry(delta.player).or_insert(0) += delta.points;
        }
        totals
    }
}

/// Read-only inputs to a simulator step
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Current time, Unix seconds
    pub now: f64,
    /// When the active mode was selected, Unix seconds
    pub started_at: f64,
    /// Number of players in the session roster
    pub roster_size: u32,
    pub positions: &'a BTreeMap<PlayerId, PlayerPosition>,
}

impl TickContext<'_> {
    pub fn roster(&self) -> impl Iterator<Item = PlayerId> {
        1..=self.roster_size
    }
}

/// The three simulators, selected by the arena's current variant
#[derive(Debug, Clone, Default)]
pub struct Simulators {
    pub coin: CoinCascade,
    pub disco: DiscoDash,
    pub barrage: BulletBarrage,
}

impl Simulators {
    /// Advance the arena by one tick.
    ///
    /// `inputs` is the whole drained queue; modes without discrete inputs
    /// discard it.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        arena: Arena,
        ctx: &TickContext<'_>,
        inputs: Vec<InputEvent>,
        rng: &mut R,
    ) -> (Arena, TickOutcome) {
        let mut outcome = TickOutcome::default();
        let arena = match arena {
            Arena::Idle => Arena::Idle,
            Arena::CoinCascade(coins) => {
                Arena::CoinCascade(self.coin.step(coins, ctx, rng, &mut outcome))
            }
            Arena::DiscoDash(targets) => {
                Arena::DiscoDash(self.disco.step(targets, ctx, &inputs, &mut outcome))
            }
            Arena::BulletBarrage(hazards) => {
                Arena::BulletBarrage(self.barrage.step(hazards, ctx, rng, &mut outcome))
            }
        };
        (arena, outcome)
    }
}
