//! Bullet Barrage: dodge horizontally scrolling hazards

use rand::Rng;
use uuid::Uuid;

use super::kinematics::Kinematics;
use super::{Hazard, ObjectBase, ScoreReason, TickContext, TickOutcome};

/// Bullet Barrage tuning
#[derive(Debug, Clone)]
pub struct BarrageConfig {
    /// Hazards kept alive in the arena
    pub min_hazards: usize,
    pub spawn_x: f64,
    pub spawn_y: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// A player closer than this to a hazard is hit
    pub hit_radius: f64,
    /// Players not hit by the time the hazard crosses this x dodged it
    pub dodge_x: f64,
    /// Hazards at or left of this x are removed
    pub despawn_x: f64,
}

impl Default for BarrageConfig {
    fn default() -> Self {
        Self {
            min_hazards: 1,
            spawn_x: 2.5,
            spawn_y: -0.25,
            min_speed: 0.005,
            max_speed: 0.015,
            hit_radius: 0.2,
            dodge_x: -2.5,
            despawn_x: -2.8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulletBarrage {
    pub config: BarrageConfig,
}

impl BulletBarrage {
    pub fn new(config: BarrageConfig) -> Self {
        Self { config }
    }

    pub fn step<R: Rng + ?Sized>(
        &self,
        hazards: Vec<Hazard>,
        ctx: &TickContext<'_>,
        rng: &mut R,
        outcome: &mut TickOutcome,
    ) -> Vec<Hazard> {
        let mut kept = Vec::with_capacity(hazards.len().max(self.config.min_hazards));

        for mut hazard in hazards {
            hazard.x = Kinematics::scroll(hazard.spawn_x, hazard.speed, ctx.now - hazard.base.spawned_at);
            self.score(&mut hazard, ctx, outcome);

            if hazard.x > self.config.despawn_x {
                kept.push(hazard);
            }
        }

        while kept.len() < self.config.min_hazards {
            kept.push(self.spawn(ctx.now, rng));
        }

        kept
    }

    /// Credit each roster player at most once per hazard: a hit if touched,
    /// otherwise a dodge once the hazard crosses the dodge line.
    fn score(&self, hazard: &mut Hazard, ctx: &TickContext<'_>, outcome: &mut TickOutcome) {
        for player in ctx.roster() {
            if hazard.credited(player) {
                continue;
            }

            let touched = ctx.positions.get(&player).is_some_and(|pos| {
                Kinematics::within((hazard.x, hazard.y), (pos.x, pos.y), self.config.hit_radius)
            });

            if touched {
                hazard.scored_hits.insert(player);
                outcome.credit(player, -1, ScoreReason::HazardHit);
            } else if hazard.x < self.config.dodge_x {
                hazard.scored_dodges.insert(player);
                outcome.credit(player, 1, ScoreReason::HazardDodged);
            }
        }
    }

    fn spawn<R: Rng + ?Sized>(&self, now: f64, rng: &mut R) -> Hazard {
        Hazard {
            base: ObjectBase {
                id: Uuid::new_v4().to_string(),
                spawned_at: now,
            },
            x: self.config.spawn_x,
            y: self.config.spawn_y,
            spawn_x: self.config.spawn_x,
            speed: rng.gen_range(self.config.min_speed..self.config.max_speed),
            scored_hits: Default::default(),
            scored_dodges: Default::default(),
        }
    }
}
