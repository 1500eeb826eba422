//! Data-driven game balance
//!
//! Every product-tuning value lives here. Defaults mirror the shipped feel;
//! a JSON document can override any subset of fields. Malformed documents fall
//! back to the defaults so startup never fails on bad data.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// One entry of the normal-object table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    pub key: String,
    /// Cosmetic tag for juice particles
    pub juice_color: u32,
    pub points: u32,
    /// Relative selection weight (higher = more common)
    pub weight: u32,
}

impl ObjectType {
    fn new(key: &str, juice_color: u32, points: u32, weight: u32) -> Self {
        Self {
            key: key.to_string(),
            juice_color,
            points,
            weight,
        }
    }
}

/// Default object table
pub fn default_object_table() -> Vec<ObjectType> {
    vec![
        ObjectType::new("red_mask", 0xff0000, 10, 100),
        ObjectType::new("golden_crown", 0xffd700, 15, 80),
        ObjectType::new("sheriff_hat", 0x8b4513, 12, 100),
        ObjectType::new("jester_hat", 0x4169e1, 12, 100),
        ObjectType::new("pearl_shell", 0xc0c0c0, 14, 70),
        ObjectType::new("red_wrench", 0xff4500, 11, 90),
        ObjectType::new("golden_coin", 0xffd700, 30, 2),
        ObjectType::new("carousel_ride", 0x32cd32, 16, 50),
        ObjectType::new("red_alchemist", 0x8a2be2, 14, 60),
        ObjectType::new("green_dragon", 0x228b22, 22, 15),
        ObjectType::new("phoenix_emblem", 0xff4500, 25, 5),
        ObjectType::new("x_coin", 0x000000, 18, 25),
    ]
}

/// Game balance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Session ===
    pub lives: u32,
    pub pool_capacity: usize,

    // === Scoring ===
    /// Time since the previous slice that still counts as perfect (ms)
    pub perfect_window_ms: f64,
    /// Radius around the playfield center that counts as perfect
    pub perfect_zone_radius: f32,
    /// Combo expires this long after the last hit (ms)
    pub combo_window_ms: f64,
    pub combo_multiplier: f64,
    pub perfect_multiplier: f64,
    pub frenzy_multiplier: f64,
    pub frenzy_threshold: u32,
    pub frenzy_duration_ms: f64,
    /// Spawn delay factor while frenzy is active
    pub frenzy_spawn_factor: f32,
    pub spectacular_threshold: u32,
    pub spectacular_bonus_per_object: u32,
    pub chain_base_progress: u32,

    // === Slice detection ===
    pub base_hit_radius: f32,
    /// Extra radius per px/s of swipe speed
    pub speed_radius_factor: f32,
    pub max_speed_bonus: f32,
    /// Constant assist radius for input latency
    pub magnet_radius: f32,
    pub near_miss_radius: f32,
    /// Rolling trail history length (ms)
    pub trail_window_ms: f64,

    // === Difficulty ===
    /// Score needed per score-derived level
    pub difficulty_interval: u64,
    /// Elapsed time per time-derived level (ms)
    pub time_level_interval_ms: f64,
    pub max_time_level: u32,
    /// EMA smoothing factor for hit/miss outcomes
    pub ema_alpha: f32,
    pub ema_initial: f32,
    /// Fraction the success pull may move the spawn delay
    pub success_pull_strength: f32,
    /// EMA below this is treated as struggling
    pub struggle_threshold: f32,
    pub min_spawn_delay_ms: f32,
    pub max_spawn_delay_ms: f32,
    /// Level at which the base delay curve bottoms out
    pub spawn_curve_max_level: u32,
    /// Exponential smoothing rate of the live delay (per second)
    pub spawn_delay_smoothing: f32,
    /// Delay before the first wave of a session (ms)
    pub first_spawn_delay_ms: f64,
    pub relief_duration_ms: f64,
    pub relief_levels: u32,

    // === Spawn composition ===
    pub fairness_window: u32,
    pub min_bomb_chance: f32,
    pub max_bomb_chance: f32,
    pub golden_chance: f32,
    pub min_multi_chance: f32,
    pub max_multi_chance: f32,
    pub max_multi_count: u32,
    /// Level at which bomb and multi-object chances reach their maximum
    pub composition_curve_max_level: u32,
    pub side_throw_start_level: u32,
    pub criss_cross_start_level: u32,
    pub max_chaos_level: u32,
    pub speed_boost_chance: f32,
    pub speed_boost_start_level: u32,
    pub speed_increase_per_level: f32,
    pub max_speed_multiplier: f32,
    pub gravity_increase_per_level: f32,
    /// Total level from which multi-object waves may follow a bomb pattern
    pub challenging_start_level: u32,
    pub challenging_pattern_chance: f32,

    // === Special modes ===
    pub rapid_fire_start_level: u32,
    /// Roll made on every normal slice
    pub rapid_fire_activation_chance: f32,
    pub rapid_fire_duration_ms: f64,
    pub rapid_fire_spawn_factor: f32,
    /// Chance that a rapid-fire spawn event is a staggered burst
    pub rapid_fire_burst_chance: f32,
    pub rapid_fire_burst_min: u32,
    pub rapid_fire_burst_max: u32,
    /// Gap between burst throws (ms)
    pub rapid_fire_burst_step_ms: f64,
    pub chaos_start_level: u32,
    pub chaos_activation_chance: f32,
    pub chaos_duration_ms: f64,
    pub chaos_spawn_factor: f32,
    /// Chance that a chaos spawn event is a scripted wave
    pub chaos_wave_chance: f32,
    pub chaos_min_wave: u32,
    /// Bomb share of a bombardment wave
    pub chaos_bombardment_bomb_chance: f32,

    // === Physics ===
    /// Downward acceleration (px/s²)
    pub gravity: f32,
    pub launch_speed: f32,
    /// Minimum height above the bottom edge every launch must reach
    pub min_rise: f32,
    pub object_radius: f32,
    /// Golden objects are drawn and hit-tested larger
    pub golden_radius_scale: f32,

    // === Boundaries ===
    pub fall_margin: f32,
    pub side_margin: f32,
    pub top_margin: f32,

    // === Golden event ===
    pub golden_points_per_hit: u32,
    pub golden_max_hits: u32,
    pub golden_precision_radius: f32,
    pub golden_hover_ms: f64,
    pub golden_hit_window_ms: f64,
    pub golden_window_step_ms: f64,
    pub golden_window_floor_ms: f64,
    pub golden_miss_penalty: u32,
    pub golden_exit_delay_ms: f64,

    pub objects: Vec<ObjectType>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            lives: 3,
            pool_capacity: 48,

            perfect_window_ms: 300.0,
            perfect_zone_radius: 200.0,
            combo_window_ms: 1000.0,
            combo_multiplier: 1.05,
            perfect_multiplier: 1.4,
            frenzy_multiplier: 2.0,
            frenzy_threshold: 10,
            frenzy_duration_ms: 8000.0,
            frenzy_spawn_factor: 0.6,
            spectacular_threshold: 3,
            spectacular_bonus_per_object: 50,
            chain_base_progress: 10,

            base_hit_radius: 50.0,
            speed_radius_factor: 0.006,
            max_speed_bonus: 15.0,
            magnet_radius: 12.0,
            near_miss_radius: 95.0,
            trail_window_ms: 150.0,

            difficulty_interval: 150,
            time_level_interval_ms: 30_000.0,
            max_time_level: 10,
            ema_alpha: 0.15,
            ema_initial: 0.5,
            success_pull_strength: 0.25,
            struggle_threshold: 0.4,
            min_spawn_delay_ms: 450.0,
            max_spawn_delay_ms: 1600.0,
            spawn_curve_max_level: 8,
            spawn_delay_smoothing: 1.5,
            first_spawn_delay_ms: 1000.0,
            relief_duration_ms: 3000.0,
            relief_levels: 3,

            fairness_window: 20,
            min_bomb_chance: 0.06,
            max_bomb_chance: 0.22,
            golden_chance: 0.015,
            min_multi_chance: 0.1,
            max_multi_chance: 0.6,
            max_multi_count: 5,
            composition_curve_max_level: 6,
            side_throw_start_level: 2,
            criss_cross_start_level: 4,
            max_chaos_level: 8,
            speed_boost_chance: 0.1,
            speed_boost_start_level: 3,
            speed_increase_per_level: 0.03,
            max_speed_multiplier: 1.3,
            gravity_increase_per_level: 0.02,
            challenging_start_level: 6,
            challenging_pattern_chance: 0.3,

            rapid_fire_start_level: 5,
            rapid_fire_activation_chance: 0.02,
            rapid_fire_duration_ms: 10_000.0,
            rapid_fire_spawn_factor: 0.4,
            rapid_fire_burst_chance: 0.4,
            rapid_fire_burst_min: 3,
            rapid_fire_burst_max: 6,
            rapid_fire_burst_step_ms: 200.0,
            chaos_start_level: 8,
            chaos_activation_chance: 0.015,
            chaos_duration_ms: 15_000.0,
            chaos_spawn_factor: 0.3,
            chaos_wave_chance: 0.5,
            chaos_min_wave: 5,
            chaos_bombardment_bomb_chance: 0.3,

            gravity: 420.0,
            launch_speed: 640.0,
            min_rise: 320.0,
            object_radius: 40.0,
            golden_radius_scale: 1.5,

            fall_margin: 50.0,
            side_margin: 250.0,
            top_margin: 600.0,

            golden_points_per_hit: 25,
            golden_max_hits: 20,
            golden_precision_radius: 80.0,
            golden_hover_ms: 4000.0,
            golden_hit_window_ms: 1500.0,
            golden_window_step_ms: 50.0,
            golden_window_floor_ms: 100.0,
            golden_miss_penalty: 2,
            golden_exit_delay_ms: 1500.0,

            objects: default_object_table(),
        }
    }
}

impl Tuning {
    /// Parse tuning overrides from JSON (missing fields keep defaults)
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        if tuning.objects.is_empty() || tuning.objects.iter().all(|o| o.weight == 0) {
            return Err(ConfigError::Invalid {
                field: "objects",
                reason: "object table needs at least one entry with weight > 0",
            });
        }
        Ok(tuning.sanitized())
    }

    /// Load tuning from optional JSON, falling back to defaults on any error
    pub fn load_or_default(json: Option<&str>) -> Self {
        match json {
            Some(json) => match Self::from_json(json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning overrides");
                    tuning
                }
                Err(e) => {
                    log::warn!("{}; using default tuning", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Repair inverted ranges and out-of-range values
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if !self.min_spawn_delay_ms.is_finite() || self.min_spawn_delay_ms <= 0.0 {
            self.min_spawn_delay_ms = defaults.min_spawn_delay_ms;
        }
        if !self.max_spawn_delay_ms.is_finite() {
            self.max_spawn_delay_ms = defaults.max_spawn_delay_ms;
        }
        if self.min_spawn_delay_ms > self.max_spawn_delay_ms {
            std::mem::swap(&mut self.min_spawn_delay_ms, &mut self.max_spawn_delay_ms);
        }
        if self.min_bomb_chance > self.max_bomb_chance {
            std::mem::swap(&mut self.min_bomb_chance, &mut self.max_bomb_chance);
        }
        if self.min_multi_chance > self.max_multi_chance {
            std::mem::swap(&mut self.min_multi_chance, &mut self.max_multi_chance);
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            self.ema_alpha = defaults.ema_alpha;
        }
        self.ema_initial = if self.ema_initial.is_finite() {
            self.ema_initial.clamp(0.0, 1.0)
        } else {
            defaults.ema_initial
        };
        self.min_bomb_chance = self.min_bomb_chance.clamp(0.0, 1.0);
        self.max_bomb_chance = self.max_bomb_chance.clamp(0.0, 1.0);
        self.golden_chance = self.golden_chance.clamp(0.0, 1.0);
        for chance in [
            &mut self.challenging_pattern_chance,
            &mut self.rapid_fire_activation_chance,
            &mut self.rapid_fire_burst_chance,
            &mut self.chaos_activation_chance,
            &mut self.chaos_wave_chance,
            &mut self.chaos_bombardment_bomb_chance,
        ] {
            *chance = if chance.is_finite() { chance.clamp(0.0, 1.0) } else { 0.0 };
        }
        for factor in [
            &mut self.frenzy_spawn_factor,
            &mut self.rapid_fire_spawn_factor,
            &mut self.chaos_spawn_factor,
        ] {
            if !(factor.is_finite() && *factor > 0.0) {
                *factor = 1.0;
            }
        }
        if self.rapid_fire_burst_min > self.rapid_fire_burst_max {
            std::mem::swap(&mut self.rapid_fire_burst_min, &mut self.rapid_fire_burst_max);
        }
        self.rapid_fire_burst_min = self.rapid_fire_burst_min.max(1);
        self.rapid_fire_burst_max = self.rapid_fire_burst_max.max(self.rapid_fire_burst_min);
        self.chaos_min_wave = self.chaos_min_wave.max(1);
        self.max_multi_count = self.max_multi_count.max(1);
        self.difficulty_interval = self.difficulty_interval.max(1);
        self.spawn_curve_max_level = self.spawn_curve_max_level.max(1);
        self.composition_curve_max_level = self.composition_curve_max_level.max(1);
        self.chain_base_progress = self.chain_base_progress.max(1);
        self.golden_max_hits = self.golden_max_hits.max(1);
        self.pool_capacity = self.pool_capacity.max(1);
        if self.time_level_interval_ms <= 0.0 {
            self.time_level_interval_ms = defaults.time_level_interval_ms;
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            self.gravity = defaults.gravity;
        }
        if self.relief_duration_ms <= 0.0 {
            self.relief_duration_ms = defaults.relief_duration_ms;
        }
        if self.objects.is_empty() || self.objects.iter().all(|o| o.weight == 0) {
            self.objects = defaults.objects;
        }
        self
    }

    /// Per-hit answer window for the golden event after `hits` hits
    pub fn golden_window_ms(&self, hits: u32) -> f64 {
        let shrink = hits.saturating_sub(1) as f64 * self.golden_window_step_ms;
        (self.golden_hit_window_ms - shrink).max(self.golden_window_floor_ms)
    }

    /// Most points a single golden event can award
    pub fn golden_max_points(&self) -> u64 {
        self.golden_points_per_hit as u64 * self.golden_max_hits as u64
    }
}
