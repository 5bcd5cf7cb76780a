//! Coin Cascade: collect falling pickups

use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use super::kinematics::Kinematics;
use super::{Coin, ObjectBase, PlayerId, ScoreReason, TickContext, TickOutcome};

/// Coin Cascade tuning
#[derive(Debug, Clone)]
pub struct CoinConfig {
    /// Pickups kept alive in the arena
    pub capacity: usize,
    /// Seconds after spawn before a pickup expires
    pub max_age_secs: f64,
    /// Pickups below this height are removed
    pub floor_y: f64,
    /// Collection radius around a player
    pub collect_radius: f64,
    pub spawn_y: f64,
    /// Horizontal spawn band (half width, centred on 0)
    pub spawn_half_width: f64,
    pub min_gravity: f64,
    pub max_gravity: f64,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            max_age_secs: 5.0,
            floor_y: -0.65,
            collect_radius: 0.3,
            spawn_y: 1.0,
            spawn_half_width: 1.5,
            min_gravity: 0.005,
            max_gravity: 0.025,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoinCascade {
    pub config: CoinConfig,
}

impl CoinCascade {
    pub fn new(config: CoinConfig) -> Self {
        Self { config }
    }

    pub fn step<R: Rng + ?Sized>(
        &self,
        coins: Vec<Coin>,
        ctx: &TickContext<'_>,
        rng: &mut R,
        outcome: &mut TickOutcome,
    ) -> Vec<Coin> {
        let mut kept = Vec::with_capacity(self.config.capacity);

        for mut coin in coins {
            let age = ctx.now - coin.base.spawned_at;
            if age > self.config.max_age_secs {
                continue;
            }

            coin.y = Kinematics::fall(coin.spawn_y, coin.gravity, age);

            if let Some(player) = self.collector(&coin, ctx) {
                outcome.credit(player, 1, ScoreReason::Collected);
                continue;
            }

            if coin.y < self.config.floor_y {
                continue;
            }

            kept.push(coin);
        }

        while kept.len() < self.config.capacity {
            kept.push(self.spawn(ctx.now, rng));
        }

        kept
    }

    /// First player (lowest id) within reach of the pickup
    fn collector(&self, coin: &Coin, ctx: &TickContext<'_>) -> Option<PlayerId> {
        let (player, position) = ctx.positions.iter().find(|(_, pos)| {
            Kinematics::within((coin.x, coin.y), (pos.x, pos.y), self.config.collect_radius)
        })?;

        if let Some(sent_at) = position.sent_at {
            let latency_ms = ctx.now * 1000.0 - sent_at;
            debug!(player = *player, coin = %coin.base.id, latency_ms, "Coin collected");
        }

        Some(*player)
    }

    fn spawn<R: Rng + ?Sized>(&self, now: f64, rng: &mut R) -> Coin {
        let half = self.config.spawn_half_width;
        Coin {
            base: ObjectBase {
                id: Uuid::new_v4().to_string(),
                spawned_at: now,
            },
            x: rng.gen_range(-half..=half),
            y: self.config.spawn_y,
            spawn_y: self.config.spawn_y,
            gravity: rng.gen_range(self.config.min_gravity..self.config.max_gravity),
        }
    }
}
