//! Difficulty signal
//!
//! Two inputs drive difficulty: a level derived from score and elapsed time,
//! and an EMA of recent hit/miss outcomes. The level sets the base spawn delay
//! and the bomb and multi-object chances; the EMA pulls the delay down while the
//! player is doing well and relaxes it (and the bomb chance) while they
//! struggle. After a golden event, a relief window knocks a few levels off.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;
use crate::{ease_in_out_quad, lerp};

/// Ease from `from` (level 0) to `to` (at `max_level` and beyond)
pub fn curve(level: u32, from: f32, to: f32, max_level: u32) -> f32 {
    let t = (level as f32 / max_level.max(1) as f32).min(1.0);
    lerp(from, to, ease_in_out_quad(t))
}

/// Level from score alone
pub fn score_level(tuning: &Tuning, score: u64) -> u32 {
    (score / tuning.difficulty_interval.max(1)) as u32
}

/// Level from elapsed play time alone (capped)
pub fn time_level(tuning: &Tuning, elapsed_ms: f64) -> u32 {
    let level = (elapsed_ms.max(0.0) / tuning.time_level_interval_ms).floor() as u32;
    level.min(tuning.max_time_level)
}

/// Combined level: the stronger source plus half the weaker one
pub fn total_level(tuning: &Tuning, score: u64, elapsed_ms: f64) -> u32 {
    let s = score_level(tuning, score);
    let t = time_level(tuning, elapsed_ms);
    s.max(t) + s.min(t) / 2
}

/// Live difficulty state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultySignal {
    /// Smoothed success rate in [0, 1]
    pub ema: f32,
    alpha: f32,
    /// Live spawn delay, smoothed toward the target each tick (ms)
    pub spawn_delay_ms: f32,
    /// Highest total level announced so far
    pub announced_level: u32,
    /// End of the post-golden relief window
    pub relief_until_ms: Option<f64>,
}

impl DifficultySignal {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            ema: tuning.ema_initial.clamp(0.0, 1.0),
            alpha: tuning.ema_alpha,
            spawn_delay_ms: tuning.max_spawn_delay_ms,
            announced_level: 0,
            relief_until_ms: None,
        }
    }

    /// Fold one resolved interaction into the EMA
    pub fn record_outcome(&mut self, success: bool) {
        let sample = if success { 1.0 } else { 0.0 };
        self.ema = (self.ema + self.alpha * (sample - self.ema)).clamp(0.0, 1.0);
    }

    pub fn is_struggling(&self, tuning: &Tuning) -> bool {
        self.ema < tuning.struggle_threshold
    }

    /// Open the relief window
    pub fn start_relief(&mut self, tuning: &Tuning, now_ms: f64) {
        self.relief_until_ms = Some(now_ms + tuning.relief_duration_ms);
    }

    /// Levels removed by the relief window (decays to 0)
    pub fn relief_reduction(&self, tuning: &Tuning, now_ms: f64) -> u32 {
        match self.relief_until_ms {
            Some(until) if until > now_ms => {
                let remaining = (until - now_ms) / tuning.relief_duration_ms;
                (remaining * tuning.relief_levels as f64).floor() as u32
            }
            _ => 0,
        }
    }

    /// Total level minus relief
    pub fn effective_level(&self, tuning: &Tuning, score: u64, now_ms: f64) -> u32 {
        total_level(tuning, score, now_ms).saturating_sub(self.relief_reduction(tuning, now_ms))
    }

    /// Announce a new total level once; returns it if it rose
    pub fn observe_level(&mut self, total: u32) -> Option<u32> {
        if total > self.announced_level {
            self.announced_level = total;
            Some(total)
        } else {
            None
        }
    }

    /// Delay the live spawn delay is smoothed toward (ms, clamped)
    ///
    /// `pace` is the product of the active spawn factors (frenzy, rapid fire,
    /// chaos); 1.0 when none is running.
    pub fn target_delay_ms(&self, tuning: &Tuning, level: u32, pace: f32) -> f32 {
        let base = curve(
            level,
            tuning.max_spawn_delay_ms,
            tuning.min_spawn_delay_ms,
            tuning.spawn_curve_max_level,
        );
        // ema 1.0 shortens by the pull strength, ema 0.0 lengthens by it
        let pull = 1.0 - tuning.success_pull_strength * (self.ema - 0.5) * 2.0;
        let delay = base * pull * pace;
        delay.clamp(tuning.min_spawn_delay_ms, tuning.max_spawn_delay_ms)
    }

    /// Exponential step of the live delay toward `target_ms`
    pub fn smooth(&mut self, tuning: &Tuning, target_ms: f32, dt: f32) {
        let k = 1.0 - (-tuning.spawn_delay_smoothing * dt).exp();
        self.spawn_delay_ms += (target_ms - self.spawn_delay_ms) * k;
        self.spawn_delay_ms = self
            .spawn_delay_ms
            .clamp(tuning.min_spawn_delay_ms, tuning.max_spawn_delay_ms);
    }

    /// Per-slot bomb probability for the spawn event numbered `spawn_events`
    pub fn bomb_chance(&self, tuning: &Tuning, level: u32, spawn_events: u32) -> f32 {
        if spawn_events < tuning.fairness_window {
            return 0.0;
        }
        let chance = curve(
            level,
            tuning.min_bomb_chance,
            tuning.max_bomb_chance,
            tuning.composition_curve_max_level,
        );
        if self.is_struggling(tuning) {
            chance * 0.5
        } else {
            chance
        }
    }
}

/// Probability that a wave holds more than one object
pub fn multi_chance(tuning: &Tuning, level: u32) -> f32 {
    curve(
        level,
        tuning.min_multi_chance,
        tuning.max_multi_chance,
        tuning.composition_curve_max_level,
    )
}

/// Largest wave allowed at `level`
pub fn max_wave_size(tuning: &Tuning, level: u32) -> u32 {
    (2 + level / 2).min(tuning.max_multi_count).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_levels_combine() {
        let tuning = Tuning::default();
        assert_eq!(score_level(&tuning, 449), 2);
        assert_eq!(time_level(&tuning, 95_000.0), 3);
        assert_eq!(time_level(&tuning, 1.0e9), tuning.max_time_level);
        // max(2, 3) + 2 / 2
        assert_eq!(total_level(&tuning, 449, 95_000.0), 4);
    }

    #[test]
    fn test_relief_window_decays() {
        let tuning = Tuning::default();
        let mut signal = DifficultySignal::new(&tuning);
        signal.start_relief(&tuning, 1000.0);
        assert_eq!(signal.relief_reduction(&tuning, 1000.0), 3);
        assert_eq!(signal.relief_reduction(&tuning, 2500.0), 1);
        assert_eq!(signal.relief_reduction(&tuning, 4000.0), 0);
        assert_eq!(signal.effective_level(&tuning, 900, 1000.0), 3);
    }

    #[test]
    fn test_fairness_window_blocks_bombs() {
        let tuning = Tuning::default();
        let signal = DifficultySignal::new(&tuning);
        for n in 0..tuning.fairness_window {
            assert_eq!(signal.bomb_chance(&tuning, 20, n), 0.0);
        }
        assert!(signal.bomb_chance(&tuning, 20, tuning.fairness_window) > 0.0);
    }

    #[test]
    fn test_struggling_halves_bomb_chance() {
        let tuning = Tuning::default();
        let mut signal = DifficultySignal::new(&tuning);
        let normal = signal.bomb_chance(&tuning, 6, 100);
        for _ in 0..20 {
            signal.record_outcome(false);
        }
        assert!(signal.is_struggling(&tuning));
        assert_eq!(signal.bomb_chance(&tuning, 6, 100), normal * 0.5);
    }

    #[test]
    fn test_success_pulls_delay_down() {
        let tuning = Tuning::default();
        let mut good = DifficultySignal::new(&tuning);
        let mut bad = DifficultySignal::new(&tuning);
        for _ in 0..30 {
            good.record_outcome(true);
            bad.record_outcome(false);
        }
        let level = 3;
        assert!(good.target_delay_ms(&tuning, level, 1.0) < bad.target_delay_ms(&tuning, level, 1.0));
        assert!(
            good.target_delay_ms(&tuning, level, tuning.frenzy_spawn_factor)
                <= good.target_delay_ms(&tuning, level, 1.0)
        );
    }

    #[test]
    fn test_special_mode_pace_shortens_delay() {
        let tuning = Tuning::default();
        let signal = DifficultySignal::new(&tuning);
        let calm = signal.target_delay_ms(&tuning, 2, 1.0);
        let rapid = signal.target_delay_ms(&tuning, 2, tuning.rapid_fire_spawn_factor);
        let chaos = signal.target_delay_ms(&tuning, 2, tuning.chaos_spawn_factor);
        assert!(rapid < calm);
        assert!(chaos < rapid);
        assert!(chaos >= tuning.min_spawn_delay_ms);
    }

    #[test]
    fn test_delay_curve_decreases_with_level() {
        let tuning = Tuning::default();
        let signal = DifficultySignal::new(&tuning);
        let mut prev = f32::MAX;
        for level in 0..=tuning.spawn_curve_max_level + 2 {
            let d = signal.target_delay_ms(&tuning, level, 1.0);
            assert!(d <= prev);
            prev = d;
        }
    }

    #[test]
    fn test_smoothing_approaches_target_without_snapping() {
        let tuning = Tuning::default();
        let mut signal = DifficultySignal::new(&tuning);
        let start = signal.spawn_delay_ms;
        signal.smooth(&tuning, tuning.min_spawn_delay_ms, crate::consts::SIM_DT);
        assert!(signal.spawn_delay_ms < start);
        assert!(signal.spawn_delay_ms > tuning.min_spawn_delay_ms);
        for _ in 0..10_000 {
            signal.smooth(&tuning, tuning.min_spawn_delay_ms, crate::consts::SIM_DT);
        }
        assert!((signal.spawn_delay_ms - tuning.min_spawn_delay_ms).abs() < 1.0);
    }

    #[test]
    fn test_observe_level_announces_rises_once() {
        let tuning = Tuning::default();
        let mut signal = DifficultySignal::new(&tuning);
        assert_eq!(signal.observe_level(0), None);
        assert_eq!(signal.observe_level(2), Some(2));
        assert_eq!(signal.observe_level(2), None);
        assert_eq!(signal.observe_level(1), None);
    }

    #[test]
    fn test_wave_size_cap() {
        let tuning = Tuning::default();
        assert_eq!(max_wave_size(&tuning, 0), 2);
        assert_eq!(max_wave_size(&tuning, 4), 4);
        assert_eq!(max_wave_size(&tuning, 40), tuning.max_multi_count);
    }

    proptest! {
        #[test]
        fn prop_ema_stays_in_unit_interval(outcomes in proptest::collection::vec(any::<bool>(), 0..200)) {
            let tuning = Tuning::default();
            let mut signal = DifficultySignal::new(&tuning);
            for success in outcomes {
                signal.record_outcome(success);
                prop_assert!((0.0..=1.0).contains(&signal.ema));
            }
        }

        #[test]
        fn prop_target_delay_is_clamped(
            level in 0u32..100,
            outcomes in proptest::collection::vec(any::<bool>(), 0..60),
            pace in 0.01f32..=1.0,
        ) {
            let tuning = Tuning::default();
            let mut signal = DifficultySignal::new(&tuning);
            for success in outcomes {
                signal.record_outcome(success);
            }
            let d = signal.target_delay_ms(&tuning, level, pace);
            prop_assert!(d >= tuning.min_spawn_delay_ms && d <= tuning.max_spawn_delay_ms);
        }
    }
}
