//! Spawn controller
//!
//! A repeating timer fires spawn events. Each event plans its throws (what
//! kind each slot is, an optional forced pattern and a delay), then throws
//! every slot along a pattern-specific trajectory. Most events are a plain
//! wave thrown at once. Higher levels add scripted bomb patterns, and the
//! special modes add staggered rapid-fire bursts and chaos waves whose later
//! throws wait in a queue. The delay until the next event is read from the
//! difficulty signal after every firing.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::{max_wave_size, multi_chance, total_level};
use super::geometry::weighted_pick;
use super::golden::GoldenEvent;
use super::modes::SpecialMode;
use super::state::{GameState, ObjectKind, ThrowPattern};
use super::timer::Timer;
use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH};
use crate::tuning::Tuning;

/// Juice tag of bombs and golden objects
const BOMB_JUICE: u32 = 0x000000;
const GOLDEN_JUICE: u32 = 0xffd700;

/// Velocity factor of a speed-boosted throw
const SPEED_BOOST: f32 = 1.25;

/// Bomb layouts of a challenging wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BombPattern {
    /// A bomb in the middle slot, fruit either side
    Sandwich,
    /// Criss-cross throws with bombs only on even slots
    CrissCross,
    /// Bombs may sit on the outer slots
    Flanks,
}

/// Scripted waves of chaos mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChaosPattern {
    Spiral,
    Wave,
    Bombardment,
    /// Paired throws from both sides at once
    Pincer,
}

impl ChaosPattern {
    /// Gap between consecutive throws (ms)
    fn step_ms(self) -> f64 {
        match self {
            ChaosPattern::Spiral | ChaosPattern::Pincer => 150.0,
            ChaosPattern::Wave => 100.0,
            ChaosPattern::Bombardment => 120.0,
        }
    }
}

/// How a spawn event was put together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveShape {
    Standard,
    Challenging(BombPattern),
    Chaos(ChaosPattern),
    RapidBurst,
}

/// One throw of a spawn event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedThrow {
    pub kind: ObjectKind,
    /// Forced pattern; `None` picks one at throw time
    pub pattern: Option<ThrowPattern>,
    /// Slot within the wave, for band spacing and side alternation
    pub index: u32,
    pub count: u32,
    /// Offset from the spawn event (ms)
    pub delay_ms: f64,
}

/// A throw waiting for its turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueuedThrow {
    pub due_ms: f64,
    pub throw: PlannedThrow,
}

/// What one spawn event may contain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveRules {
    pub total_level: u32,
    /// Per-slot bomb chance; 0 inside the fairness window
    pub bomb_chance: f32,
    pub multi_chance: f32,
    pub max_size: u32,
    pub golden_allowed: bool,
    pub rapid_fire: bool,
    pub chaos: bool,
}

/// Spawn cadence and counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnController {
    pub timer: Timer,
    /// Spawn events fired this session
    pub spawn_events: u32,
    /// Staggered throws of earlier events, in due order
    pub queue: Vec<QueuedThrow>,
    first_delay_ms: f64,
}

impl SpawnController {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            timer: Timer::default(),
            spawn_events: 0,
            queue: Vec::new(),
            first_delay_ms: tuning.first_spawn_delay_ms,
        }
    }

    /// Schedule the first wave
    pub fn start(&mut self, now_ms: f64) {
        self.timer.restart(now_ms, self.first_delay_ms);
    }

    pub fn stop(&mut self) {
        self.timer.cancel();
        self.queue.clear();
    }

    /// Drop throws that have not left yet
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn suspend(&mut self, now_ms: f64) {
        self.timer.suspend(now_ms);
    }

    pub fn resume(&mut self, now_ms: f64) {
        self.timer.resume(now_ms);
    }

    pub fn is_suspended(&self) -> bool {
        self.timer.is_suspended()
    }
}

/// Throw queued objects that are due, then fire the spawn timer if due and
/// reschedule it with the live delay
pub fn update(state: &mut GameState) {
    let now = state.clock_ms;
    if !state.spawner.queue.is_empty() && !state.spawner.is_suspended() {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.spawner.queue)
            .into_iter()
            .partition(|q| q.due_ms <= now);
        state.spawner.queue = waiting;
        for queued in ready {
            if !throw_one(state, &queued.throw) {
                log::debug!("Object pool exhausted, dropping a queued throw");
            }
        }
    }
    if state.spawner.timer.poll(now) {
        spawn_wave(state);
        let delay = state.difficulty.spawn_delay_ms as f64;
        state.spawner.timer.restart(now, delay);
    }
}

/// Pick a normal variety from the weighted object table
pub fn pick_normal<R: Rng + ?Sized>(rng: &mut R, tuning: &Tuning) -> ObjectKind {
    let weights: Vec<u32> = tuning.objects.iter().map(|o| o.weight).collect();
    let variety = weighted_pick(rng, &weights).unwrap_or(0);
    let points = tuning.objects.get(variety).map_or(0, |o| o.points);
    ObjectKind::Normal {
        variety: variety as u16,
        points,
    }
}

/// Number of objects in a wave
fn roll_wave_size<R: Rng + ?Sized>(rng: &mut R, multi_chance: f32, max_size: u32) -> u32 {
    if max_size >= 2 && rng.random::<f32>() < multi_chance {
        rng.random_range(2..=max_size)
    } else {
        1
    }
}

/// Decide the size and per-slot kinds of one wave
///
/// Golden rolls are independent of bomb rolls and at most one golden object is
/// planned per wave. A wave made only of bombs gets one slot turned back into
/// a normal object, so a single-object wave is never a bomb.
pub fn plan_wave<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    bomb_chance: f32,
    multi_chance: f32,
    max_size: u32,
    golden_allowed: bool,
) -> Vec<ObjectKind> {
    let count = roll_wave_size(rng, multi_chance, max_size);
    compose_wave(rng, tuning, count, bomb_chance, golden_allowed)
}

/// Roll the kinds of `count` slots
fn compose_wave<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    count: u32,
    bomb_chance: f32,
    golden_allowed: bool,
) -> Vec<ObjectKind> {
    let mut golden_planned = !golden_allowed;
    let mut wave: Vec<ObjectKind> = (0..count)
        .map(|_| {
            if rng.random::<f32>() < bomb_chance {
                ObjectKind::Bomb
            } else if !golden_planned && rng.random::<f32>() < tuning.golden_chance {
                golden_planned = true;
                ObjectKind::Golden
            } else {
                pick_normal(rng, tuning)
            }
        })
        .collect();

    if wave.iter().all(|k| *k == ObjectKind::Bomb) {
        let slot = rng.random_range(0..wave.len());
        wave[slot] = pick_normal(rng, tuning);
    }
    wave
}

/// Plan every throw of one spawn event
///
/// Chaos waves and rapid-fire bursts need their mode to be running. Bomb
/// patterns and bombardment bombs are only placed when `rules.bomb_chance` is
/// above zero, so the fairness window holds for every shape. Whatever the
/// shape, an event made only of bombs has one of them turned into a normal.
pub fn plan_event<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    rules: &WaveRules,
) -> (WaveShape, Vec<PlannedThrow>) {
    let bombs_allowed = rules.bomb_chance > 0.0;
    let count = roll_wave_size(rng, rules.multi_chance, rules.max_size);

    let (shape, mut throws) = if rules.chaos && rng.random::<f32>() < tuning.chaos_wave_chance {
        let pattern = match rng.random_range(0..4) {
            0 => ChaosPattern::Spiral,
            1 => ChaosPattern::Wave,
            2 => ChaosPattern::Bombardment,
            _ => ChaosPattern::Pincer,
        };
        let count = count.max(tuning.chaos_min_wave);
        (
            WaveShape::Chaos(pattern),
            plan_chaos(rng, tuning, rules, pattern, count),
        )
    } else if rules.rapid_fire && rng.random::<f32>() < tuning.rapid_fire_burst_chance {
        (WaveShape::RapidBurst, plan_rapid_burst(rng, tuning))
    } else if rules.total_level >= tuning.challenging_start_level
        && count > 1
        && bombs_allowed
        && rng.random::<f32>() < tuning.challenging_pattern_chance
    {
        let pattern = match rng.random_range(0..3) {
            0 => BombPattern::Sandwich,
            1 => BombPattern::CrissCross,
            _ => BombPattern::Flanks,
        };
        (
            WaveShape::Challenging(pattern),
            plan_challenging(rng, tuning, pattern, count),
        )
    } else {
        let kinds = compose_wave(rng, tuning, count, rules.bomb_chance, rules.golden_allowed);
        (WaveShape::Standard, at_once(&kinds, None))
    };

    if throws.iter().all(|t| t.kind == ObjectKind::Bomb) && !throws.is_empty() {
        let slot = rng.random_range(0..throws.len());
        throws[slot].kind = pick_normal(rng, tuning);
    }
    (shape, throws)
}

/// Throws for `kinds`, all leaving with the spawn event
fn at_once(kinds: &[ObjectKind], pattern: Option<ThrowPattern>) -> Vec<PlannedThrow> {
    let count = kinds.len() as u32;
    kinds
        .iter()
        .enumerate()
        .map(|(index, &kind)| PlannedThrow {
            kind,
            pattern,
            index: index as u32,
            count,
            delay_ms: 0.0,
        })
        .collect()
}

/// Multi-object wave with scripted bomb slots
pub fn plan_challenging<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    pattern: BombPattern,
    count: u32,
) -> Vec<PlannedThrow> {
    let kinds: Vec<ObjectKind> = (0..count)
        .map(|i| {
            let bomb = match pattern {
                BombPattern::Sandwich => i == count / 2,
                BombPattern::CrissCross => i % 2 == 0 && rng.random_bool(0.4),
                BombPattern::Flanks => (i == 0 || i + 1 == count) && rng.random_bool(0.5),
            };
            if bomb {
                ObjectKind::Bomb
            } else {
                pick_normal(rng, tuning)
            }
        })
        .collect();
    let throw_pattern = match pattern {
        BombPattern::CrissCross => ThrowPattern::CrissCross,
        BombPattern::Sandwich | BombPattern::Flanks => ThrowPattern::Classic,
    };
    at_once(&kinds, Some(throw_pattern))
}

/// Chaos wave of `count` objects, staggered by the pattern's step
pub fn plan_chaos<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    rules: &WaveRules,
    pattern: ChaosPattern,
    count: u32,
) -> Vec<PlannedThrow> {
    let step = pattern.step_ms();
    match pattern {
        ChaosPattern::Pincer => {
            let pairs = count.div_ceil(2);
            let kinds = compose_wave(rng, tuning, pairs * 2, rules.bomb_chance, rules.golden_allowed);
            kinds
                .chunks(2)
                .enumerate()
                .flat_map(|(pair, kinds)| {
                    let sides = [ThrowPattern::LeftToRight, ThrowPattern::RightToLeft];
                    kinds.iter().zip(sides).enumerate().map(move |(side, (&kind, p))| {
                        PlannedThrow {
                            kind,
                            pattern: Some(p),
                            index: (pair * 2 + side) as u32,
                            count: pairs * 2,
                            delay_ms: pair as f64 * step,
                        }
                    })
                })
                .collect()
        }
        _ => {
            let kinds = if pattern == ChaosPattern::Bombardment {
                let bomb_share = if rules.bomb_chance > 0.0 {
                    tuning.chaos_bombardment_bomb_chance
                } else {
                    0.0
                };
                (0..count)
                    .map(|_| {
                        if rng.random::<f32>() < bomb_share {
                            ObjectKind::Bomb
                        } else {
                            pick_normal(rng, tuning)
                        }
                    })
                    .collect()
            } else {
                compose_wave(rng, tuning, count, rules.bomb_chance, rules.golden_allowed)
            };
            let mut throws = at_once(&kinds, Some(ThrowPattern::Classic));
            for throw in &mut throws {
                throw.delay_ms = throw.index as f64 * step;
            }
            throws
        }
    }
}

/// Quick single throws of normal objects, one after another
pub fn plan_rapid_burst<R: Rng + ?Sized>(rng: &mut R, tuning: &Tuning) -> Vec<PlannedThrow> {
    let n = rng.random_range(tuning.rapid_fire_burst_min..=tuning.rapid_fire_burst_max);
    (0..n)
        .map(|i| PlannedThrow {
            kind: pick_normal(rng, tuning),
            pattern: None,
            index: 0,
            count: 1,
            delay_ms: i as f64 * tuning.rapid_fire_burst_step_ms,
        })
        .collect()
}

/// Throw pattern for one slot; later patterns unlock with level
pub fn choose_pattern<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    level: u32,
    count: u32,
) -> ThrowPattern {
    use ThrowPattern::*;

    fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[ThrowPattern]) -> ThrowPattern {
        options[rng.random_range(0..options.len())]
    }

    if level < tuning.side_throw_start_level {
        return pick(rng, &[Classic, Classic, LeftToRight]);
    }
    if level < tuning.criss_cross_start_level {
        return pick(rng, &[Classic, LeftToRight, RightToLeft, SideThrow]);
    }
    if level >= tuning.max_chaos_level && count > 1 {
        return pick(
            rng,
            &[CrissCross, CrissCross, SideThrow, LeftToRight, RightToLeft],
        );
    }
    pick(
        rng,
        &[Classic, LeftToRight, RightToLeft, SideThrow, CrissCross],
    )
}

/// Spawn position and launch velocity before difficulty scaling
pub fn trajectory<R: Rng + ?Sized>(
    rng: &mut R,
    tuning: &Tuning,
    pattern: ThrowPattern,
    index: u32,
    count: u32,
) -> (Vec2, Vec2) {
    let left = -50.0;
    let right = FIELD_WIDTH + 50.0;
    match pattern {
        ThrowPattern::LeftToRight => (
            Vec2::new(left, FIELD_HEIGHT * 0.7 + rng.random_range(-50.0..=50.0)),
            Vec2::new(rng.random_range(280.0..=400.0), rng.random_range(-550.0..=-420.0)),
        ),
        ThrowPattern::RightToLeft => (
            Vec2::new(right, FIELD_HEIGHT * 0.7 + rng.random_range(-50.0..=50.0)),
            Vec2::new(rng.random_range(-400.0..=-280.0), rng.random_range(-550.0..=-420.0)),
        ),
        ThrowPattern::CrissCross => {
            let y = FIELD_HEIGHT * 0.8 + rng.random_range(-30.0..=30.0);
            let vy = rng.random_range(-600.0..=-480.0);
            if index % 2 == 0 {
                (Vec2::new(left, y), Vec2::new(rng.random_range(320.0..=420.0), vy))
            } else {
                (Vec2::new(right, y), Vec2::new(rng.random_range(-420.0..=-320.0), vy))
            }
        }
        ThrowPattern::SideThrow => {
            let y = FIELD_HEIGHT * (0.5 + rng.random::<f32>() * 0.2);
            let vy = rng.random_range(-520.0..=-400.0);
            if rng.random_bool(0.5) {
                (Vec2::new(left, y), Vec2::new(rng.random_range(250.0..=380.0), vy))
            } else {
                (Vec2::new(right, y), Vec2::new(rng.random_range(-380.0..=-250.0), vy))
            }
        }
        ThrowPattern::Classic => {
            // Wider band for multi-object waves, evenly spaced with jitter
            let x = if count <= 1 {
                FIELD_WIDTH * 0.2 + rng.random::<f32>() * FIELD_WIDTH * 0.6
            } else {
                let band = FIELD_WIDTH * 0.7;
                let spacing = band / (count - 1) as f32;
                FIELD_WIDTH * 0.15 + spacing * index as f32 + rng.random_range(-30.0..=30.0)
            };
            let (speed_jitter, drift) = if count > 1 {
                (rng.random_range(-80.0..=100.0), rng.random_range(-120.0..=120.0))
            } else {
                (rng.random_range(-60.0..=80.0), rng.random_range(-100.0..=100.0))
            };
            (
                Vec2::new(x, FIELD_HEIGHT + 50.0),
                Vec2::new(drift, -(tuning.launch_speed + speed_jitter)),
            )
        }
    }
}

/// Upward speed needed to climb from `spawn_y` to `min_rise` above the bottom edge
pub fn min_launch_speed(tuning: &Tuning, spawn_y: f32, gravity: f32) -> f32 {
    let apex_y = FIELD_HEIGHT - tuning.min_rise;
    let climb = (spawn_y - apex_y).max(0.0);
    (2.0 * gravity * climb).sqrt()
}

/// Materialize one spawn event
pub fn spawn_wave(state: &mut GameState) {
    let now = state.clock_ms;
    let level = state
        .difficulty
        .effective_level(&state.tuning, state.session.score, now);

    let golden_allowed = matches!(state.golden, GoldenEvent::Inactive)
        && !state.pool.iter_active().any(|o| o.kind == ObjectKind::Golden)
        && !state
            .spawner
            .queue
            .iter()
            .any(|q| q.throw.kind == ObjectKind::Golden);
    let rules = WaveRules {
        total_level: total_level(&state.tuning, state.session.score, now),
        bomb_chance: state
            .difficulty
            .bomb_chance(&state.tuning, level, state.spawner.spawn_events),
        multi_chance: multi_chance(&state.tuning, level),
        max_size: max_wave_size(&state.tuning, level),
        golden_allowed,
        rapid_fire: state.modes.is_active(SpecialMode::RapidFire),
        chaos: state.modes.is_active(SpecialMode::Chaos),
    };
    let (shape, throws) = plan_event(&mut state.rng, &state.tuning, &rules);
    state.spawner.spawn_events += 1;
    if shape != WaveShape::Standard {
        log::debug!("Spawn event {:?} with {} throws", shape, throws.len());
    }

    let count = throws.len();
    for (sent, throw) in throws.iter().enumerate() {
        if throw.delay_ms > 0.0 {
            state.spawner.queue.push(QueuedThrow {
                due_ms: now + throw.delay_ms,
                throw: *throw,
            });
        } else if !throw_one(state, throw) {
            log::debug!(
                "Object pool exhausted, skipping {} of {} objects",
                count - sent,
                count
            );
            break;
        }
    }
}

/// Launch one planned throw; false when the pool is exhausted
fn throw_one(state: &mut GameState, throw: &PlannedThrow) -> bool {
    let now = state.clock_ms;
    let level = state
        .difficulty
        .effective_level(&state.tuning, state.session.score, now);
    let total = total_level(&state.tuning, state.session.score, now);

    let tuning = &state.tuning;
    let rng = &mut state.rng;
    let speed_mult = (1.0 + total as f32 * tuning.speed_increase_per_level)
        .min(tuning.max_speed_multiplier);
    let gravity = tuning.gravity * (1.0 + total as f32 * tuning.gravity_increase_per_level);

    let PlannedThrow {
        kind, index, count, ..
    } = *throw;
    let pattern = throw
        .pattern
        .unwrap_or_else(|| choose_pattern(rng, tuning, level, count));
    let (pos, mut vel) = trajectory(rng, tuning, pattern, index, count);
    let speed_boost =
        total >= tuning.speed_boost_start_level && rng.random::<f32>() < tuning.speed_boost_chance;
    if speed_boost {
        vel *= SPEED_BOOST;
    }
    vel *= speed_mult;
    let needed = min_launch_speed(tuning, pos.y, gravity);
    if -vel.y < needed {
        vel.y = -needed;
    }

    let spin_ms = match pattern {
        ThrowPattern::CrissCross => 1800.0 + rng.random_range(-600.0..=600.0),
        _ => 1800.0 + rng.random_range(-400.0..=400.0),
    };

    let Some(id) = state.pool.acquire() else {
        return false;
    };
    let Some(obj) = state.pool.get_mut(id) else {
        return false;
    };
    obj.pos = pos;
    obj.vel = vel;
    obj.gravity = gravity;
    obj.angular_vel = std::f32::consts::TAU / (spin_ms / 1000.0);
    obj.kind = kind;
    obj.pattern = pattern;
    obj.speed_boost = speed_boost;
    obj.radius = tuning.object_radius;
    obj.juice_color = match kind {
        ObjectKind::Normal { variety, .. } => tuning
            .objects
            .get(variety as usize)
            .map_or(0, |o| o.juice_color),
        ObjectKind::Golden => GOLDEN_JUICE,
        _ => BOMB_JUICE,
    };
    if kind == ObjectKind::Golden {
        obj.radius *= tuning.golden_radius_scale;
    }
    true
}
