//! Fixed timestep simulation tick
//!
//! Core game loop that advances the session deterministically. Order within a
//! tick: pointer samples, timers and special modes, golden event, spawning,
//! physics, difficulty, boundary sweep.

use glam::Vec2;

use super::difficulty::total_level;
use super::golden;
use super::modes;
use super::scoring;
use super::slice::{PointerEvent, detect_cuts, effective_radius, nearest_near_miss};
use super::spawn;
use super::state::{GameEvent, GamePhase, GameState, ObjectKind};
use super::sweep;
use crate::consts::FIELD_HEIGHT;

/// Ticks between autoplay swipes
const IDLE_SWIPE_INTERVAL: u64 = 12;
/// Half length of an autoplay swipe
const IDLE_SWIPE_REACH: f32 = 70.0;
/// Autoplay leaves objects this close to a bomb alone
const IDLE_BOMB_CLEARANCE: f32 = 160.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer samples since the previous tick, in arrival order
    pub pointer: Vec<PointerEvent>,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - a bot swipes through live objects
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.set_paused(true);
                return;
            }
            GamePhase::Paused => state.set_paused(false),
            GamePhase::GameOver => {}
        }
    }

    // Don't tick if paused or game over
    match state.phase {
        GamePhase::Paused | GamePhase::GameOver => return,
        GamePhase::Playing => {}
    }

    state.time_ticks += 1;
    state.clock_ms += dt as f64 * 1000.0;

    let idle_swipe = if input.idle_mode {
        autoplay(state)
    } else {
        Vec::new()
    };
    for &event in input.pointer.iter().chain(idle_swipe.iter()) {
        handle_pointer(state, event);
        if state.is_game_over() {
            return;
        }
    }

    scoring::update_timers(state);
    modes::update(state);
    golden::update(state);
    spawn::update(state);

    // Physics (the golden focus is placed by its motion phase instead)
    let focus = state.golden.focus();
    for obj in state.pool.iter_active_mut() {
        if Some(obj.id) != focus {
            obj.integrate(dt);
        }
    }

    update_difficulty(state, dt);
    sweep::sweep(state);
}

/// Feed one pointer sample through detection and resolution
pub fn handle_pointer(state: &mut GameState, event: PointerEvent) {
    let now = state.clock_ms;
    let segment = match event {
        PointerEvent::Down(p) => {
            state.swipe.begin(p, now);
            None
        }
        PointerEvent::Move(p) => state.swipe.advance(p, now, state.tuning.trail_window_ms),
        PointerEvent::Up => {
            state.swipe.end_stroke();
            None
        }
    };

    // The golden event owns input while it runs
    if state.golden.is_active() {
        golden::handle_pointer(state, event);
        return;
    }

    let Some((a, b)) = segment else {
        return;
    };
    let radius = effective_radius(&state.tuning, state.swipe.speed());
    let focus = state.golden.focus();
    let cuts = detect_cuts(&state.pool, a, b, radius, focus);
    if cuts.is_empty() {
        let near = nearest_near_miss(
            &state.pool,
            a,
            b,
            radius,
            state.tuning.near_miss_radius,
            focus,
        );
        if let Some((id, pos)) = near {
            scoring::record_near_miss(state, id, pos);
        }
    } else {
        scoring::resolve_cuts(state, &cuts);
    }
}

/// Announce level rises and move the live spawn delay toward its target
fn update_difficulty(state: &mut GameState, dt: f32) {
    let now = state.clock_ms;
    let score = state.session.score;
    let total = total_level(&state.tuning, score, now);
    if let Some(level) = state.difficulty.observe_level(total) {
        log::info!("Difficulty increased to level {}", level);
        state.emit(GameEvent::DifficultyIncreased { level });
    }

    let level = state.difficulty.effective_level(&state.tuning, score, now);
    let pace = state
        .modes
        .pace(&state.tuning, state.session.frenzy_active());
    let target = state.difficulty.target_delay_ms(&state.tuning, level, pace);
    state.difficulty.smooth(&state.tuning, target, dt);
}

/// Bot input: a short swipe through the most urgent safe object, or a tap on
/// the golden focus
fn autoplay(state: &GameState) -> Vec<PointerEvent> {
    if state.time_ticks % IDLE_SWIPE_INTERVAL != 0 || state.swipe.slicing {
        return Vec::new();
    }

    if let Some(focus) = state.golden.focus() {
        if !state.golden.is_active() {
            return Vec::new();
        }
        let Some(target) = state.pool.get(focus).map(|o| o.pos) else {
            return Vec::new();
        };
        let outside = target + Vec2::new(state.tuning.golden_precision_radius * 2.0, 0.0);
        return vec![
            PointerEvent::Down(outside),
            PointerEvent::Move(target),
            PointerEvent::Up,
        ];
    }

    let bombs: Vec<Vec2> = state
        .pool
        .iter_active()
        .filter(|o| o.kind == ObjectKind::Bomb)
        .map(|o| o.pos)
        .collect();

    // Lowest on-screen target falls out first
    let target = state
        .pool
        .iter_active()
        .filter(|o| o.is_sliceable() && o.kind.is_normal())
        .filter(|o| o.pos.y > 0.0 && o.pos.y < FIELD_HEIGHT)
        .filter(|o| bombs.iter().all(|b| b.distance(o.pos) > IDLE_BOMB_CLEARANCE))
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .map(|o| o.pos);

    match target {
        Some(pos) => vec![
            PointerEvent::Down(pos - Vec2::new(IDLE_SWIPE_REACH, 0.0)),
            PointerEvent::Move(pos + Vec2::new(IDLE_SWIPE_REACH, 0.0)),
            PointerEvent::Up,
        ],
        None => Vec::new(),
    }
}
