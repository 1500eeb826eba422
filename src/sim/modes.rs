//! Special spawn modes
//!
//! Rapid fire and chaos are timed modes rolled on every normal slice once the
//! total level is high enough. Only one runs at a time. While one is active the
//! spawn delay is scaled down, and the spawner may plan staggered bursts
//! (rapid fire) or scripted waves of at least five objects (chaos).

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::total_level;
use super::state::{GameEvent, GameState};
use super::timer::Timer;
use crate::tuning::Tuning;

/// A timed spawn mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialMode {
    RapidFire,
    Chaos,
}

/// Expiry timers of the special modes; pending means active
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialModes {
    pub rapid_fire: Timer,
    pub chaos: Timer,
}

impl SpecialModes {
    pub fn is_active(&self, mode: SpecialMode) -> bool {
        self.timer(mode).is_pending()
    }

    pub fn any_active(&self) -> bool {
        self.rapid_fire.is_pending() || self.chaos.is_pending()
    }

    fn timer(&self, mode: SpecialMode) -> &Timer {
        match mode {
            SpecialMode::RapidFire => &self.rapid_fire,
            SpecialMode::Chaos => &self.chaos,
        }
    }

    fn timer_mut(&mut self, mode: SpecialMode) -> &mut Timer {
        match mode {
            SpecialMode::RapidFire => &mut self.rapid_fire,
            SpecialMode::Chaos => &mut self.chaos,
        }
    }

    /// Spawn delay factor of everything currently speeding up spawns
    pub fn pace(&self, tuning: &Tuning, frenzy: bool) -> f32 {
        let mut pace = 1.0;
        if frenzy {
            pace *= tuning.frenzy_spawn_factor;
        }
        if self.rapid_fire.is_pending() {
            pace *= tuning.rapid_fire_spawn_factor;
        }
        if self.chaos.is_pending() {
            pace *= tuning.chaos_spawn_factor;
        }
        pace
    }

    pub fn cancel_all(&mut self) {
        self.rapid_fire.cancel();
        self.chaos.cancel();
    }
}

/// Roll for a special mode after a normal slice
pub fn roll_activation(state: &mut GameState) {
    if state.modes.any_active() || state.is_game_over() {
        return;
    }
    let total = total_level(&state.tuning, state.session.score, state.clock_ms);
    let tuning = &state.tuning;
    let mode = if total >= tuning.rapid_fire_start_level
        && state.rng.random::<f32>() < tuning.rapid_fire_activation_chance
    {
        Some(SpecialMode::RapidFire)
    } else if total >= tuning.chaos_start_level
        && state.rng.random::<f32>() < tuning.chaos_activation_chance
    {
        Some(SpecialMode::Chaos)
    } else {
        None
    };
    if let Some(mode) = mode {
        activate(state, mode);
    }
}

/// Start `mode` for its configured duration
pub fn activate(state: &mut GameState, mode: SpecialMode) {
    let duration_ms = match mode {
        SpecialMode::RapidFire => state.tuning.rapid_fire_duration_ms,
        SpecialMode::Chaos => state.tuning.chaos_duration_ms,
    };
    state.modes.timer_mut(mode).restart(state.clock_ms, duration_ms);
    log::info!("{:?} mode started for {} ms", mode, duration_ms);
    state.emit(GameEvent::SpecialModeStarted { mode, duration_ms });
}

/// Expire modes whose time is up
pub fn update(state: &mut GameState) {
    let now = state.clock_ms;
    for mode in [SpecialMode::RapidFire, SpecialMode::Chaos] {
        if state.modes.timer_mut(mode).poll(now) {
            log::info!("{:?} mode ended", mode);
            state.emit(GameEvent::SpecialModeEnded { mode });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::scoring::resolve_cuts;
    use crate::sim::state::ObjectKind;
    use glam::Vec2;

    fn state_at_level(level: u64, tuning: Tuning) -> GameState {
        let mut state = GameState::with_tuning(3, tuning);
        state.session.score = level * state.tuning.difficulty_interval;
        state.drain_events();
        state
    }

    fn started(state: &mut GameState) -> Vec<SpecialMode> {
        state
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::SpecialModeStarted { mode, .. } => Some(mode),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_no_modes_below_start_level() {
        let tuning = Tuning {
            rapid_fire_activation_chance: 1.0,
            chaos_activation_chance: 1.0,
            ..Default::default()
        };
        let start = tuning.rapid_fire_start_level as u64;
        let mut state = state_at_level(start - 1, tuning);
        for _ in 0..50 {
            roll_activation(&mut state);
        }
        assert!(!state.modes.any_active());
        assert!(started(&mut state).is_empty());
    }

    #[test]
    fn test_rapid_fire_runs_for_its_duration() {
        let tuning = Tuning {
            rapid_fire_activation_chance: 1.0,
            chaos_activation_chance: 1.0,
            ..Default::default()
        };
        let level = tuning.chaos_start_level as u64;
        let mut state = state_at_level(level, tuning);
        roll_activation(&mut state);
        roll_activation(&mut state);
        assert!(state.modes.is_active(SpecialMode::RapidFire));
        assert!(!state.modes.is_active(SpecialMode::Chaos), "one mode at a time");
        assert_eq!(started(&mut state), vec![SpecialMode::RapidFire]);

        state.clock_ms += state.tuning.rapid_fire_duration_ms - 1.0;
        update(&mut state);
        assert!(state.modes.is_active(SpecialMode::RapidFire));
        state.clock_ms += 1.0;
        update(&mut state);
        state.clock_ms += 1000.0;
        update(&mut state);
        assert!(!state.modes.any_active());
        let ended: Vec<_> = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::SpecialModeEnded { .. }))
            .collect();
        assert_eq!(
            ended,
            vec![GameEvent::SpecialModeEnded {
                mode: SpecialMode::RapidFire
            }]
        );
    }

    #[test]
    fn test_chaos_needs_its_own_level() {
        let tuning = Tuning {
            rapid_fire_activation_chance: 0.0,
            chaos_activation_chance: 1.0,
            ..Default::default()
        };
        let chaos_level = tuning.chaos_start_level as u64;
        let mut state = state_at_level(chaos_level - 1, tuning.clone());
        roll_activation(&mut state);
        assert!(!state.modes.any_active());

        let mut state = state_at_level(chaos_level, tuning);
        roll_activation(&mut state);
        assert!(state.modes.is_active(SpecialMode::Chaos));
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::SpecialModeStarted {
                mode: SpecialMode::Chaos,
                duration_ms: state.tuning.chaos_duration_ms
            }]
        );
    }

    #[test]
    fn test_pace_multiplies_active_factors() {
        let tuning = Tuning::default();
        let mut modes = SpecialModes::default();
        assert_eq!(modes.pace(&tuning, false), 1.0);
        modes.rapid_fire.restart(0.0, 100.0);
        assert_eq!(modes.pace(&tuning, false), tuning.rapid_fire_spawn_factor);
        assert_eq!(
            modes.pace(&tuning, true),
            tuning.rapid_fire_spawn_factor * tuning.frenzy_spawn_factor
        );
        modes.cancel_all();
        modes.chaos.restart(0.0, 100.0);
        assert_eq!(modes.pace(&tuning, false), tuning.chaos_spawn_factor);
    }

    #[test]
    fn test_normal_slice_rolls_for_mode() {
        let tuning = Tuning {
            rapid_fire_activation_chance: 1.0,
            ..Default::default()
        };
        let level = tuning.rapid_fire_start_level as u64;
        let mut state = state_at_level(level, tuning);
        let id = state.pool.acquire().unwrap();
        {
            let obj = state.pool.get_mut(id).unwrap();
            obj.pos = Vec2::new(100.0, 100.0);
            obj.kind = ObjectKind::Normal {
                variety: 0,
                points: 10,
            };
        }
        resolve_cuts(&mut state, &[id]);
        assert!(state.modes.is_active(SpecialMode::RapidFire));
    }

    #[test]
    fn test_game_over_cancels_modes() {
        let mut state = GameState::new(2);
        activate(&mut state, SpecialMode::Chaos);
        state.game_over();
        assert!(!state.modes.any_active());
        roll_activation(&mut state);
        assert!(!state.modes.any_active());
    }
}
