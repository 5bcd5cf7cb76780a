//! Disco Dash: rhythm matching against a looping beatmap

use super::kinematics::Kinematics;
use super::{Action, ArrowTarget, InputEvent, Judgement, ObjectBase, TickContext, TickOutcome};

/// One scheduled cue in the beatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    /// Offset from loop start in milliseconds
    pub offset_ms: u64,
    pub action: Action,
}

/// Ordered, looping list of cues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beatmap {
    beats: Vec<Beat>,
}

impl Beatmap {
    pub fn new(mut beats: Vec<Beat>) -> Self {
        beats.sort_by_key(|b| b.offset_ms);
        Self { beats }
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    /// Loop length: the offset of the last cue
    pub fn period_ms(&self) -> u64 {
        self.beats.last().map(|b| b.offset_ms).unwrap_or(0)
    }
}

impl Default for Beatmap {
    fn default() -> Self {
        use Action::{ButtonOne, Jump, Left, Right};

        let cues = [
            (0, Jump),
            (1500, Left),
            (3000, Jump),
            (4500, Right),
            (6000, ButtonOne),
            (12000, Left),
            (13500, Jump),
            (15000, Right),
            (16500, Jump),
            (18000, Left),
            (19500, Jump),
            (20500, ButtonOne),
            (28000, Jump),
            (30500, Left),
            (32000, Right),
        ];
        Self::new(
            cues.into_iter()
                .map(|(offset_ms, action)| Beat { offset_ms, action })
                .collect(),
        )
    }
}

/// Disco Dash tuning. Coordinates are screen units along the scroll axis.
#[derive(Debug, Clone)]
pub struct DiscoConfig {
    pub beatmap: Beatmap,
    /// Cues within this distance of the current time are materialized
    pub window_ms: f64,
    /// Coordinate where a target appears
    pub spawn_offset: f64,
    /// Scroll speed in units per second
    pub speed: f64,
    pub hit_zone: f64,
    /// Inputs only match targets closer than this to the hit zone
    pub match_radius: f64,
    /// Matches at or under this distance are Perfect
    pub perfect_radius: f64,
    /// Targets at or beyond this coordinate are removed
    pub despawn_x: f64,
}

impl Default for DiscoConfig {
    fn default() -> Self {
        Self {
            beatmap: Beatmap::default(),
            window_ms: 150.0,
            spawn_offset: 1280.0,
            speed: 150.0,
            hit_zone: 80.0,
            match_radius: 50.0,
            perfect_radius: 20.0,
            despawn_x: -50.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoDash {
    pub config: DiscoConfig,
}

impl DiscoDash {
    pub fn new(config: DiscoConfig) -> Self {
        Self { config }
    }

    pub fn step(
        &self,
        mut targets: Vec<ArrowTarget>,
        ctx: &TickContext<'_>,
        inputs: &[InputEvent],
        outcome: &mut TickOutcome,
    ) -> Vec<ArrowTarget> {
        let elapsed_ms = (ctx.now - ctx.started_at) * 1000.0;
        self.materialize(&mut targets, elapsed_ms, ctx.now);

        for target in &mut targets {
            target.x = self.position_at(target, ctx.now);
        }

        for input in inputs {
            let judgement = self.judge(&mut targets, input);
            outcome.judge(input.player, judgement);
        }

        self.sweep(targets, ctx, outcome)
    }

    /// Target coordinate at `now`
    pub fn position_at(&self, target: &ArrowTarget, now: f64) -> f64 {
        Kinematics::scroll(self.config.spawn_offset, self.config.speed, now - target.base.spawned_at)
    }

    /// Add every cue of the current and next loop that falls inside the
    /// window. Ids encode loop and offset, so a cue is never added twice.
    fn materialize(&self, targets: &mut Vec<ArrowTarget>, elapsed_ms: f64, now: f64) {
        let period = self.config.beatmap.period_ms();
        let loops = if period == 0 {
            0..=0
        } else {
            let current = (elapsed_ms.max(0.0) / period as f64).floor() as u64;
            current..=current + 1
        };

        for loop_index in loops {
            for beat in self.config.beatmap.beats() {
                let scheduled_ms = (loop_index * period + beat.offset_ms) as f64;
                if (scheduled_ms - elapsed_ms).abs() >= self.config.window_ms {
                    continue;
                }

                let id = format!("arrow-{}-{}", loop_index, beat.offset_ms);
                if targets.iter().any(|t| t.base.id == id) {
                    continue;
                }

                targets.push(ArrowTarget {
                    base: ObjectBase { id, spawned_at: now },
                    action_type: beat.action,
                    x: self.config.spawn_offset,
                    scheduled_ms,
                    hit_by: Default::default(),
                    missed_by: Default::default(),
                });
            }
        }
    }

    /// Match one input against the closest eligible target.
    ///
    /// Ties on distance go to the earlier scheduled cue, then the lower id.
    fn judge(&self, targets: &mut [ArrowTarget], input: &InputEvent) -> Judgement {
        let hit_zone = self.config.hit_zone;
        let best = targets
            .iter_mut()
            .filter(|t| t.action_type == input.action && !t.judged(input.player))
            .map(|t| ((t.x - hit_zone).abs(), t))
            .filter(|(distance, _)| *distance < self.config.match_radius)
            .min_by(|(da, a), (db, b)| {
                da.total_cmp(db)
                    .then_with(|| a.scheduled_ms.total_cmp(&b.scheduled_ms))
                    .then_with(|| a.base.id.cmp(&b.base.id))
            });

        match best {
            Some((distance, target)) => {
                target.hit_by.insert(input.player);
                if distance <= self.config.perfect_radius {
                    Judgement::Perfect
                } else {
                    Judgement::Good
                }
            }
            None => Judgement::Miss,
        }
    }

    /// Charge a miss to every unjudged player once a target can no longer be
    /// hit, and drop targets that have scrolled off.
    fn sweep(
        &self,
        mut targets: Vec<ArrowTarget>,
        ctx: &TickContext<'_>,
        outcome: &mut TickOutcome,
    ) -> Vec<ArrowTarget> {
        let miss_line = self.config.hit_zone - self.config.match_radius;

        for target in &mut targets {
            if target.x >= miss_line {
                continue;
            }
            for player in ctx.roster() {
                if !target.judged(player) {
                    target.missed_by.insert(player);
                    outcome.judge(player, Judgement::Miss);
                }
            }
        }

        targets.retain(|t| t.x > self.config.despawn_x);
        targets
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::game::{PlayerId, PlayerPosition};

    const START: f64 = 1_000.0;

    fn ctx(now: f64, roster_size: u32, positions: &BTreeMap<PlayerId, PlayerPosition>) -> TickContext<'_> {
        TickContext {
            now,
            started_at: START,
            roster_size,
            positions,
        }
    }

    fn input(player: PlayerId, action: Action) -> InputEvent {
        InputEvent {
            player,
            action,
            client_timestamp: 0.0,
        }
    }

    fn single_cue(action: Action) -> Beatmap {
        Beatmap::new(vec![Beat {
            offset_ms: 0,
            action,
        }])
    }

    /// Seconds after spawn at which a default target sits exactly on the hit zone
    fn arrival_secs(config: &DiscoConfig) -> f64 {
        (config.spawn_offset - config.hit_zone) / config.speed
    }

    #[test]
    fn cues_inside_window_materialize_once() {
        let sim = DiscoDash::default();
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        let targets = sim.step(Vec::new(), &ctx(START, 2, &positions), &[], &mut outcome);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].base.id, "arrow-0-0");
        assert_eq!(targets[0].action_type, Action::Jump);

        let targets = sim.step(targets, &ctx(START + 0.1, 2, &positions), &[], &mut outcome);
        assert_eq!(targets.len(), 1);

        // 1500ms cue is outside the 150ms window at 1.2s, inside at 1.4s
        let targets = sim.step(targets, &ctx(START + 1.2, 2, &positions), &[], &mut outcome);
        assert_eq!(targets.len(), 1);
        let targets = sim.step(targets, &ctx(START + 1.4, 2, &positions), &[], &mut outcome);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].base.id, "arrow-0-1500");
    }

    #[test]
    fn next_loop_is_keyed_separately() {
        let sim = DiscoDash::default();
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        // the last cue of loop 0 and the first of loop 1 share the 32s mark
        let targets = sim.step(Vec::new(), &ctx(START + 31.95, 0, &positions), &[], &mut outcome);
        let mut ids: Vec<_> = targets.iter().map(|t| t.base.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["arrow-0-32000", "arrow-1-0"]);
        assert_eq!(targets.iter().find(|t| t.base.id == "arrow-1-0").unwrap().scheduled_ms, 32000.0);
    }

    #[test]
    fn input_on_hit_zone_scores_perfect() {
        let config = DiscoConfig {
            beatmap: single_cue(Action::Jump),
            ..DiscoConfig::default()
        };
        let arrive = arrival_secs(&config);
        let sim = DiscoDash::new(config);
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        let targets = sim.step(Vec::new(), &ctx(START, 1, &positions), &[], &mut outcome);
        let targets = sim.step(
            targets,
            &ctx(START + arrive, 1, &positions),
            &[input(1, Action::Jump)],
            &mut outcome,
        );

        assert_eq!(outcome.judgements().collect::<Vec<_>>(), vec![(1, Judgement::Perfect)]);
        assert_eq!(outcome.totals()[&1], 2);
        assert!(targets[0].hit_by.contains(&1));
    }

    #[test]
    fn input_at_spawn_on_zero_lead_lane_scores_perfect() {
        // lane where targets appear directly on the hit zone
        let config = DiscoConfig {
            beatmap: single_cue(Action::Jump),
            spawn_offset: 80.0,
            ..DiscoConfig::default()
        };
        let sim = DiscoDash::new(config);
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        sim.step(Vec::new(), &ctx(START, 1, &positions), &[input(1, Action::Jump)], &mut outcome);

        assert_eq!(outcome.judgements().collect::<Vec<_>>(), vec![(1, Judgement::Perfect)]);
        assert_eq!(outcome.deltas[0].points, 2);
    }

    #[test]
    fn near_but_not_perfect_scores_good() {
        let config = DiscoConfig {
            beatmap: single_cue(Action::Left),
            ..DiscoConfig::default()
        };
        let arrive = arrival_secs(&config);
        let sim = DiscoDash::new(config);
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        let targets = sim.step(Vec::new(), &ctx(START, 1, &positions), &[], &mut outcome);
        // 0.2s early => 30 units from the hit zone
        sim.step(
            targets,
            &ctx(START + arrive - 0.2, 1, &positions),
            &[input(1, Action::Left)],
            &mut outcome,
        );

        assert_eq!(outcome.judgements().collect::<Vec<_>>(), vec![(1, Judgement::Good)]);
    }

    #[test]
    fn wrong_action_or_far_target_is_a_miss_without_marking() {
        let config = DiscoConfig {
            beatmap: single_cue(Action::Jump),
            ..DiscoConfig::default()
        };
        let sim = DiscoDash::new(config);
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        let targets = sim.step(
            Vec::new(),
            &ctx(START, 2, &positions),
            &[input(1, Action::Jump), input(2, Action::Right)],
            &mut outcome,
        );

        assert_eq!(
            outcome.judgements().collect::<Vec<_>>(),
            vec![(1, Judgement::Miss), (2, Judgement::Miss)]
        );
        assert!(targets[0].hit_by.is_empty());
        assert!(targets[0].missed_by.is_empty());
    }

    #[test]
    fn every_input_gets_exactly_one_judgement() {
        let config = DiscoConfig {
            beatmap: single_cue(Action::Jump),
            ..DiscoConfig::default()
        };
        let arrive = arrival_secs(&config);
        let sim = DiscoDash::new(config);
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        let targets = sim.step(Vec::new(), &ctx(START, 2, &positions), &[], &mut outcome);
        let inputs = vec![
            input(1, Action::Jump),
            input(1, Action::Jump),
            input(2, Action::Jump),
        ];
        sim.step(targets, &ctx(START + arrive, 2, &positions), &inputs, &mut outcome);

        // the second press from player 1 has nothing left to hit
        assert_eq!(
            outcome.judgements().collect::<Vec<_>>(),
            vec![
                (1, Judgement::Perfect),
                (1, Judgement::Miss),
                (2, Judgement::Perfect),
            ]
        );
    }

    #[test]
    fn equal_distance_prefers_earlier_scheduled_target() {
        let sim = DiscoDash::default();
        let positions = BTreeMap::new();
        let make = |id: &str, scheduled_ms: f64| ArrowTarget {
            base: ObjectBase {
                id: id.to_string(),
                spawned_at: START,
            },
            action_type: Action::Jump,
            x: 0.0,
            scheduled_ms,
            hit_by: Default::default(),
            missed_by: Default::default(),
        };
        // same spawn time => same position; listed later-first on purpose
        let targets = vec![make("arrow-9-500", 9500.0), make("arrow-9-100", 9100.0)];
        let mut outcome = TickOutcome::default();
        let now = START + arrival_secs(&sim.config);

        let targets = sim.step(targets, &ctx(now, 1, &positions), &[input(1, Action::Jump)], &mut outcome);

        let hit: Vec<_> = targets.iter().filter(|t| t.hit_by.contains(&1)).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].base.id, "arrow-9-100");
    }

    #[test]
    fn passed_target_charges_each_unjudged_player_once() {
        let config = DiscoConfig {
            beatmap: single_cue(Action::Jump),
            ..DiscoConfig::default()
        };
        let arrive = arrival_secs(&config);
        let sim = DiscoDash::new(config);
        let positions = BTreeMap::new();
        let mut outcome = TickOutcome::default();

        let targets = sim.step(Vec::new(), &ctx(START, 3, &positions), &[], &mut outcome);
        let targets = sim.step(
            targets,
            &ctx(START + arrive, 3, &positions),
            &[input(2, Action::Jump)],
            &mut outcome,
        );

        // past the hit zone (x = 20) but not yet off screen
        let mut miss_outcome = TickOutcome::default();
        let targets = sim.step(targets, &ctx(START + arrive + 0.4, 3, &positions), &[], &mut miss_outcome);
        assert_eq!(
            miss_outcome.judgements().collect::<Vec<_>>(),
            vec![(1, Judgement::Miss), (3, Judgement::Miss)]
        );
        assert_eq!(targets.len(), 1);

        // further ticks charge nothing more, and the target is eventually dropped
        let mut later = TickOutcome::default();
        let targets = sim.step(targets, &ctx(START + arrive + 0.6, 3, &positions), &[], &mut later);
        assert!(later.deltas.is_empty());
        assert_eq!(targets.len(), 1);

        let mut gone = TickOutcome::default();
        let targets = sim.step(targets, &ctx(START + arrive + 1.0, 3, &positions), &[], &mut gone);
        assert!(gone.deltas.is_empty());
        assert!(targets.is_empty());
    }

    #[test]
    fn beatmap_period_is_last_offset() {
        assert_eq!(Beatmap::default().period_ms(), 32_000);
        assert_eq!(Beatmap::new(Vec::new()).period_ms(), 0);
        let unordered = Beatmap::new(vec![
            Beat { offset_ms: 500, action: Action::Left },
            Beat { offset_ms: 100, action: Action::Right },
        ]);
        assert_eq!(unordered.beats()[0].offset_ms, 100);
        assert_eq!(unordered.period_ms(), 500);
    }
}
