//! Golden event
//!
//! Cutting a golden object freezes it at a focal point and turns the session
//! into a precision mini-game: the entry cut counts as the first hit when it
//! passes through the precision radius, every later entry of the pointer into
//! the radius is another hit, and a stroke that never enters it is a miss. Hits
//! shrink the answer window and every second hit escalates the motion phase.
//! The event finalizes at the hit cap, when the window lapses, or when misses
//! drain the hit count to zero; after a short exit delay spawning resumes and
//! the difficulty relief window opens.
//!
//! Motion is a pure function of phase and time since the phase started.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::segment_distance;
use super::slice::PointerEvent;
use super::state::{GameEvent, GameState, ObjectId, ObjectKind};
use super::timer::Timer;
use crate::tuning::Tuning;
use crate::{ease_in_out_quad, field_center};

/// Highest motion phase
pub const MAX_PHASE: u32 = 6;

/// Focal point sits a little above the playfield center
const FOCAL_LIFT: f32 = 50.0;

/// An event in progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenRun {
    pub object: ObjectId,
    pub hits: u32,
    /// Motion phase, never decreases
    pub phase: u32,
    pub phase_start_ms: f64,
    pub anchor: Vec2,
    /// Hover timeout before the first hit, then the per-hit answer window
    pub timeout: Timer,
    pub points: u64,
    /// Pointer was inside the precision radius at the last sample
    pointer_inside: bool,
    /// A stroke is in progress
    stroke_open: bool,
    /// The current stroke has landed at least one hit
    stroke_hit: bool,
}

/// Golden event state machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum GoldenEvent {
    #[default]
    Inactive,
    Active(GoldenRun),
    /// Exit effects are playing; cleanup runs when `exit` fires
    Finalizing {
        object: ObjectId,
        exit: Timer,
        hits: u32,
        points: u64,
    },
}

impl GoldenEvent {
    /// True from the first cut until cleanup
    pub fn is_engaged(&self) -> bool {
        !matches!(self, GoldenEvent::Inactive)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, GoldenEvent::Active(_))
    }

    /// Object that owns input focus, if any
    pub fn focus(&self) -> Option<ObjectId> {
        match self {
            GoldenEvent::Inactive => None,
            GoldenEvent::Active(run) => Some(run.object),
            GoldenEvent::Finalizing { object, .. } => Some(*object),
        }
    }
}

/// Points for the `hit`-th hit (1-indexed); nothing past the cap
pub fn ladder_points(tuning: &Tuning, hit: u32) -> u64 {
    if (1..=tuning.golden_max_hits).contains(&hit) {
        tuning.golden_points_per_hit as u64
    } else {
        0
    }
}

/// Motion phase reached after `hits` hits
#[inline]
pub fn phase_for_hits(hits: u32) -> u32 {
    (hits / 2).min(MAX_PHASE)
}

/// Per-phase motion: peak offset from the anchor and hop length
struct Motion {
    amplitude: Vec2,
    /// Seconds per hop (random-walk phases) or per cycle (smooth phases)
    period: f32,
}

const MOTIONS: [Motion; 7] = [
    // Gentle float
    Motion { amplitude: Vec2::new(0.0, 15.0), period: 3.0 },
    // Drift
    Motion { amplitude: Vec2::new(60.0, 20.0), period: 1.6 },
    // Zigzag
    Motion { amplitude: Vec2::new(40.0, 25.0), period: 0.4 },
    // Figure-8
    Motion { amplitude: Vec2::new(70.0, 40.0), period: 1.05 },
    // Erratic burst
    Motion { amplitude: Vec2::new(50.0, 35.0), period: 0.225 },
    // High speed
    Motion { amplitude: Vec2::new(60.0, 40.0), period: 0.15 },
    // Maximal chaos
    Motion { amplitude: Vec2::new(70.0, 45.0), period: 0.12 },
];

/// Deterministic hop target in [-1, 1]² (splitmix64 finalizer)
fn hop_target(seed: u64, phase: u32, hop: u64) -> Vec2 {
    let mut z = seed ^ ((phase as u64) << 56) ^ hop.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    let x = (z & 0xffff_ffff) as f32 / u32::MAX as f32;
    let y = (z >> 32) as f32 / u32::MAX as f32;
    Vec2::new(x * 2.0 - 1.0, y * 2.0 - 1.0)
}

/// Offset from the anchor `elapsed_s` seconds into `phase`
pub fn phase_offset(phase: u32, elapsed_s: f32, seed: u64) -> Vec2 {
    let phase = phase.min(MAX_PHASE);
    let motion = &MOTIONS[phase as usize];
    let t = elapsed_s.max(0.0);
    let amp = motion.amplitude;
    match phase {
        0 | 1 => {
            // Yoyo from the anchor to the peak and back
            let s = 0.5 - 0.5 * (std::f32::consts::TAU * t / motion.period).cos();
            match phase {
                0 => Vec2::new(0.0, -amp.y * s),
                _ => Vec2::new(-amp.x * s, -amp.y * s),
            }
        }
        3 => {
            let w = std::f32::consts::TAU / motion.period;
            Vec2::new(amp.x * (w * t).sin(), amp.y * (2.0 * w * t).sin())
        }
        _ => {
            // Random walk between hashed targets, each hop eased
            let hops = t / motion.period;
            let hop = hops.floor() as u64;
            let frac = ease_in_out_quad(hops - hops.floor());
            let from = if hop == 0 {
                Vec2::ZERO
            } else {
                hop_target(seed, phase, hop - 1) * amp
            };
            let to = hop_target(seed, phase, hop) * amp;
            from.lerp(to, frac)
        }
    }
}

/// Begin the event on golden object `id`
pub fn start(state: &mut GameState, id: ObjectId) {
    if state.golden.is_engaged() || state.is_game_over() {
        return;
    }
    let now = state.clock_ms;
    let anchor = field_center() - Vec2::new(0.0, FOCAL_LIFT);
    let cut_pos = match state.pool.get_mut(id) {
        Some(obj) if obj.kind == ObjectKind::Golden => {
            let cut_pos = obj.pos;
            obj.sliced = true;
            obj.vel = Vec2::ZERO;
            obj.gravity = 0.0;
            obj.pos = anchor;
            cut_pos
        }
        _ => return,
    };
    let entry_hit = state.swipe.segment.is_some_and(|(a, b)| {
        segment_distance(a, b, cut_pos) <= state.tuning.golden_precision_radius
    });

    // Everything else leaves quietly: no score, no penalty, no explosions
    let mut cleared_objects = 0;
    let mut cleared_bombs = 0;
    for other in state.pool.active_ids() {
        if other == id {
            continue;
        }
        let is_bomb = state
            .pool
            .get(other)
            .is_some_and(|o| o.kind == ObjectKind::Bomb);
        if state.pool.release(other) {
            if is_bomb {
                cleared_bombs += 1;
            } else {
                cleared_objects += 1;
            }
        }
    }

    state.spawner.suspend(now);
    state.spawner.clear_queue();
    let mut timeout = Timer::default();
    timeout.restart(now, state.tuning.golden_hover_ms);
    state.golden = GoldenEvent::Active(GoldenRun {
        object: id,
        hits: 0,
        phase: 0,
        phase_start_ms: now,
        anchor,
        timeout,
        points: 0,
        pointer_inside: false,
        // The cut that triggered the event never counts as a miss
        stroke_open: state.swipe.slicing,
        stroke_hit: true,
    });

    log::info!(
        "Golden event started (cleared {} objects, {} bombs)",
        cleared_objects,
        cleared_bombs
    );
    state.emit(GameEvent::GoldenStarted {
        id,
        cleared_objects,
        cleared_bombs,
    });
    if entry_hit {
        register_hit(state);
    }
}

/// Route one pointer sample to the active event
pub fn handle_pointer(state: &mut GameState, event: PointerEvent) {
    let GoldenEvent::Active(run) = &state.golden else {
        return;
    };
    let Some(center) = state.pool.get(run.object).map(|o| o.pos) else {
        return;
    };
    let radius = state.tuning.golden_precision_radius;
    let inside = |p: Vec2| p.distance(center) <= radius;

    let mut hit = false;
    let mut miss = false;
    if let GoldenEvent::Active(run) = &mut state.golden {
        match event {
            PointerEvent::Down(p) => {
                run.stroke_open = true;
                run.stroke_hit = false;
                run.pointer_inside = inside(p);
                hit = run.pointer_inside;
            }
            PointerEvent::Move(p) => {
                if run.stroke_open {
                    let now_inside = inside(p);
                    hit = now_inside && !run.pointer_inside;
                    run.pointer_inside = now_inside;
                }
            }
            PointerEvent::Up => {
                miss = run.stroke_open && !run.stroke_hit;
                run.stroke_open = false;
                run.pointer_inside = false;
            }
        }
        if hit {
            run.stroke_hit = true;
        }
    }

    if hit {
        register_hit(state);
    } else if miss {
        register_miss(state);
    }
}

fn register_hit(state: &mut GameState) {
    let now = state.clock_ms;
    let max_hits = state.tuning.golden_max_hits;
    let max_points = state.tuning.golden_max_points();
    let GoldenEvent::Active(run) = &mut state.golden else {
        return;
    };
    run.hits += 1;
    let hits = run.hits;
    let points = ladder_points(&state.tuning, hits);
    run.points += points;

    let phase = run.phase.max(phase_for_hits(hits));
    if phase > run.phase {
        run.phase = phase;
        run.phase_start_ms = now;
        log::debug!("Golden motion phase {}", phase);
    }
    run.timeout.restart(now, state.tuning.golden_window_ms(hits));

    state.add_score(points);
    state.bump_streak();
    state.emit(GameEvent::GoldenHit {
        hits,
        points,
        max_hits,
        max_points,
    });
    if hits >= max_hits {
        finalize(state);
    }
}

fn register_miss(state: &mut GameState) {
    let now = state.clock_ms;
    let GoldenEvent::Active(run) = &mut state.golden else {
        return;
    };
    run.hits = run.hits.saturating_sub(state.tuning.golden_miss_penalty);
    let hits = run.hits;
    if hits > 0 {
        run.timeout.restart(now, state.tuning.golden_window_ms(hits));
    }
    state.emit(GameEvent::GoldenMiss { hits });
    if hits == 0 {
        finalize(state);
    }
}

/// Close the event; cleanup follows after the exit delay
pub fn finalize(state: &mut GameState) {
    let GoldenEvent::Active(run) = &state.golden else {
        return;
    };
    let (object, hits, points) = (run.object, run.hits, run.points);
    let mut exit = Timer::default();
    exit.restart(state.clock_ms, state.tuning.golden_exit_delay_ms);
    state.golden = GoldenEvent::Finalizing {
        object,
        exit,
        hits,
        points,
    };
    log::info!("Golden event finished: {} hits, {} points", hits, points);
    state.emit(GameEvent::GoldenFinished { hits, points });
}

/// Per-tick: move the focus object, poll the timeout and the exit delay
pub fn update(state: &mut GameState) {
    let now = state.clock_ms;
    let seed = state.seed;
    match &mut state.golden {
        GoldenEvent::Inactive => {}
        GoldenEvent::Active(run) => {
            let elapsed_s = ((now - run.phase_start_ms) / 1000.0) as f32;
            let pos = run.anchor + phase_offset(run.phase, elapsed_s, seed ^ run.object.0 as u64);
            let timed_out = run.timeout.poll(now);
            if let Some(obj) = state.pool.get_mut(run.object) {
                obj.pos = pos;
            }
            if timed_out {
                finalize(state);
            }
        }
        GoldenEvent::Finalizing { object, exit, .. } => {
            if exit.poll(now) {
                let object = *object;
                state.pool.release(object);
                state.golden = GoldenEvent::Inactive;
                state.spawner.resume(now);
                state.difficulty.start_relief(&state.tuning, now);
                log::debug!("Golden event cleaned up, spawning resumed");
            }
        }
    }
}
