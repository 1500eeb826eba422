//! Game state and core simulation types
//!
//! Everything a session needs lives in one owned [`GameState`]; components
//! receive it (or the part they need) by reference instead of reading shared
//! globals.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultySignal;
use super::golden::GoldenEvent;
use super::modes::{SpecialMode, SpecialModes};
use super::slice::SwipeTracker;
use super::spawn::SpawnController;
use super::timer::Timer;
use crate::highscores::{HighScoreEntry, HighScores};
use crate::persistence::ProgressStats;
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game logic is frozen
    Paused,
    /// Run ended (terminal)
    GameOver,
}

/// Stable pool slot index
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectId(pub u32);

/// What a live object is, with kind-specific data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectKind {
    Normal {
        /// Index into the tuning object table
        variety: u16,
        points: u32,
    },
    Bomb,
    Golden,
    /// Pooled slot with no kind assigned
    #[default]
    Unassigned,
}

impl ObjectKind {
    pub fn is_normal(&self) -> bool {
        matches!(self, ObjectKind::Normal { .. })
    }
}

/// How an object was thrown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThrowPattern {
    /// Up from the bottom of the central band
    #[default]
    Classic,
    LeftToRight,
    RightToLeft,
    /// Alternating sides by slot index
    CrissCross,
    /// From a random side at mid height
    SideThrow,
}

/// A live falling/thrown entity (or a pooled, inactive slot)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Rotation (radians) - cosmetic
    pub angle: f32,
    pub angular_vel: f32,
    /// Downward acceleration applied by the physics step
    pub gravity: f32,
    pub radius: f32,
    pub kind: ObjectKind,
    /// Cosmetic tag for juice particles
    pub juice_color: u32,
    pub pattern: ThrowPattern,
    pub speed_boost: bool,
    pub sliced: bool,
    pub active: bool,
}

impl GameObject {
    fn empty(id: ObjectId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Live and not yet sliced
    #[inline]
    pub fn is_sliceable(&self) -> bool {
        self.active && !self.sliced
    }

    /// Gravity-integrated fall (semi-implicit Euler)
    pub fn integrate(&mut self, dt: f32) {
        self.vel.y += self.gravity * dt;
        self.pos += self.vel * dt;
        self.angle += self.angular_vel * dt;
    }
}

/// Fixed-capacity object pool with a free list
///
/// Acquire/release must balance; release wipes every per-object tag so a
/// reused slot never carries stale state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPool {
    slots: Vec<GameObject>,
    /// Free slot indices (popped from the back)
    free: Vec<u32>,
}

impl ObjectPool {
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity as u32)
            .map(|i| GameObject::empty(ObjectId(i)))
            .collect();
        // Reverse so slot 0 is handed out first
        let free = (0..capacity as u32).rev().collect();
        Self { slots, free }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Take a free slot, or `None` when the pool is exhausted
    pub fn acquire(&mut self) -> Option<ObjectId> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        *slot = GameObject::empty(ObjectId(index));
        slot.active = true;
        Some(ObjectId(index))
    }

    /// Return a slot to the free list; releasing an inactive slot is a no-op
    pub fn release(&mut self, id: ObjectId) -> bool {
        match self.slots.get_mut(id.0 as usize) {
            Some(slot) if slot.active => {
                *slot = GameObject::empty(id);
                self.free.push(id.0);
                true
            }
            _ => false,
        }
    }

    /// Active object by id
    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.slots.get(id.0 as usize).filter(|o| o.active)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.slots.get_mut(id.0 as usize).filter(|o| o.active)
    }

    /// Active objects in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = &GameObject> {
        self.slots.iter().filter(|o| o.active)
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut GameObject> {
        self.slots.iter_mut().filter(|o| o.active)
    }

    /// Snapshot of active ids in slot order
    pub fn active_ids(&self) -> Vec<ObjectId> {
        self.iter_active().map(|o| o.id).collect()
    }
}

/// Pointer sample kept for the trail and swipe speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlicePoint {
    pub pos: Vec2,
    pub time_ms: f64,
}

/// Hit classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceQuality {
    Normal,
    Perfect,
}

/// Payload of the terminal transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverSummary {
    pub final_score: u64,
    /// Local leaderboard rank (1-indexed) if the score placed
    pub rank: Option<usize>,
    pub is_high_score: bool,
    pub top_scores: Vec<HighScoreEntry>,
    pub max_combo: u32,
}

/// Notifications for the UI collaborator, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreUpdated { score: u64 },
    LivesUpdated { lives: u32 },
    ComboUpdated { combo: u32 },
    StreakUpdated { streak: u32 },
    ObjectSliced {
        id: ObjectId,
        pos: Vec2,
        points: u64,
        quality: SliceQuality,
        juice_color: u32,
    },
    PerfectSlice { pos: Vec2 },
    NearMiss { id: ObjectId, pos: Vec2 },
    SpectacularSlice { count: u32, bonus: u64 },
    ChainLevelUp { level: u32 },
    FrenzyStarted { duration_ms: f64 },
    FrenzyEnded,
    SpecialModeStarted { mode: SpecialMode, duration_ms: f64 },
    SpecialModeEnded { mode: SpecialMode },
    DifficultyIncreased { level: u32 },
    ObjectMissed { id: ObjectId, pos: Vec2 },
    BombHit { pos: Vec2 },
    GoldenStarted { id: ObjectId, cleared_objects: u32, cleared_bombs: u32 },
    GoldenHit {
        hits: u32,
        points: u64,
        max_hits: u32,
        max_points: u64,
    },
    GoldenMiss { hits: u32 },
    GoldenFinished { hits: u32, points: u64 },
    PersonalBest { score: u64 },
    Paused,
    Resumed,
    GameOver(GameOverSummary),
}

/// Score, combo and streak bookkeeping for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Monotonic non-negative score
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub lives: u32,
    /// Consecutive slices since the last life loss
    pub slice_streak: u32,
    pub total_sliced: u32,
    pub perfect_slices: u32,
    pub perfect_streak: u32,
    pub near_misses: u32,
    pub spectacular_slices: u32,
    pub chain_level: u32,
    pub chain_progress: u32,
    /// Clock time of the most recent normal slice
    pub last_slice_ms: Option<f64>,
    /// Combo expiry (restarted on every hit)
    pub combo_timer: Timer,
    /// Frenzy expiry; pending means frenzy is active
    pub frenzy_timer: Timer,
}

impl SessionState {
    pub fn new(lives: u32) -> Self {
        Self {
            score: 0,
            combo: 0,
            max_combo: 0,
            lives,
            slice_streak: 0,
            total_sliced: 0,
            perfect_slices: 0,
            perfect_streak: 0,
            near_misses: 0,
            spectacular_slices: 0,
            chain_level: 1,
            chain_progress: 0,
            last_slice_ms: None,
            combo_timer: Timer::default(),
            frenzy_timer: Timer::default(),
        }
    }

    pub fn frenzy_active(&self) -> bool {
        self.frenzy_timer.is_pending()
    }
}

fn default_rng() -> Pcg32 {
    Pcg32::seed_from_u64(0)
}

/// Complete session state (deterministic for a given seed and input stream)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    #[serde(skip, default = "default_rng")]
    pub rng: Pcg32,
    pub tuning: Tuning,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Simulation clock (ms); frozen while paused
    pub clock_ms: f64,
    pub phase: GamePhase,
    pub session: SessionState,
    pub pool: ObjectPool,
    pub swipe: SwipeTracker,
    pub difficulty: DifficultySignal,
    pub spawner: SpawnController,
    /// Rapid-fire and chaos timers
    pub modes: SpecialModes,
    pub golden: GoldenEvent,
    /// Local leaderboard snapshot used to rank the final score
    pub high_scores: HighScores,
    /// Cross-session stats; `stats_dirty` asks the host to persist them
    pub stats: ProgressStats,
    pub stats_dirty: bool,
    /// Pending notifications (drained by the host)
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new game state with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        Self::with_context(seed, tuning, HighScores::new(), ProgressStats::default())
    }

    /// Create a session seeded with the host's leaderboard and stats
    pub fn with_context(
        seed: u64,
        tuning: Tuning,
        high_scores: HighScores,
        stats: ProgressStats,
    ) -> Self {
        let tuning = tuning.sanitized();
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            clock_ms: 0.0,
            phase: GamePhase::Playing,
            session: SessionState::new(tuning.lives),
            pool: ObjectPool::new(tuning.pool_capacity),
            swipe: SwipeTracker::default(),
            difficulty: DifficultySignal::new(&tuning),
            spawner: SpawnController::new(&tuning),
            modes: SpecialModes::default(),
            golden: GoldenEvent::Inactive,
            high_scores,
            stats,
            stats_dirty: false,
            events: Vec::new(),
            tuning,
        };
        state.spawner.start(state.clock_ms);

        // Initial HUD values
        state.emit(GameEvent::ScoreUpdated { score: 0 });
        state.emit(GameEvent::LivesUpdated {
            lives: state.session.lives,
        });
        state.emit(GameEvent::ComboUpdated { combo: 0 });
        state.emit(GameEvent::StreakUpdated { streak: 0 });

        log::info!("Session started (seed {})", seed);
        state
    }

    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.clock_ms
    }

    #[inline]
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn is_paused(&self) -> bool {
        self.phase == GamePhase::Paused
    }

    /// Add already-floored points (score only ever grows)
    pub fn add_score(&mut self, points: u64) {
        if points == 0 {
            return;
        }
        self.session.score = self.session.score.saturating_add(points);
        self.emit(GameEvent::ScoreUpdated {
            score: self.session.score,
        });
    }

    /// Extend the slice streak by one
    pub fn bump_streak(&mut self) {
        self.session.slice_streak += 1;
        self.emit(GameEvent::StreakUpdated {
            streak: self.session.slice_streak,
        });
    }

    /// Lose one life for a missed object; reaching zero ends the run
    pub fn lose_life(&mut self) {
        if self.is_game_over() {
            return;
        }
        self.session.lives = self.session.lives.saturating_sub(1);
        self.emit(GameEvent::LivesUpdated {
            lives: self.session.lives,
        });
        self.session.slice_streak = 0;
        self.emit(GameEvent::StreakUpdated { streak: 0 });
        self.difficulty.record_outcome(false);

        if self.session.lives == 0 {
            self.game_over();
        }
    }

    /// Enter the terminal state; later calls are no-ops
    pub fn game_over(&mut self) {
        if self.is_game_over() {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.session.combo_timer.cancel();
        self.session.frenzy_timer.cancel();
        self.modes.cancel_all();
        self.spawner.stop();
        self.golden = GoldenEvent::Inactive;
        self.swipe.end_stroke();

        let score = self.session.score;
        if score > self.stats.personal_best {
            self.stats.personal_best = score;
            self.stats_dirty = true;
            self.emit(GameEvent::PersonalBest { score });
        }

        let rank = self
            .high_scores
            .add_score(score, self.session.max_combo, self.clock_ms);
        let summary = GameOverSummary {
            final_score: score,
            rank,
            is_high_score: rank.is_some(),
            top_scores: self.high_scores.entries.clone(),
            max_combo: self.session.max_combo,
        };
        log::info!(
            "Game over: score {} (rank {:?}, max combo {})",
            score,
            rank,
            summary.max_combo
        );
        self.emit(GameEvent::GameOver(summary));
    }

    /// Pause or resume game logic
    pub fn set_paused(&mut self, paused: bool) {
        match (self.phase, paused) {
            (GamePhase::Playing, true) => {
                self.phase = GamePhase::Paused;
                self.swipe.end_stroke();
                self.emit(GameEvent::Paused);
            }
            (GamePhase::Paused, false) => {
                self.phase = GamePhase::Playing;
                self.emit(GameEvent::Resumed);
            }
            _ => {}
        }
    }
}
