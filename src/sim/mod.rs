//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool slot)
//! - No rendering or platform dependencies

pub mod difficulty;
pub mod geometry;
pub mod golden;
pub mod modes;
pub mod scoring;
pub mod slice;
pub mod spawn;
pub mod state;
pub mod sweep;
pub mod tick;
pub mod timer;

pub use difficulty::DifficultySignal;
pub use geometry::{closest_point_on_segment, segment_hits_circle, weighted_pick};
pub use golden::GoldenEvent;
pub use modes::{SpecialMode, SpecialModes};
pub use slice::{PointerEvent, SwipeTracker, detect_cuts, effective_radius};
pub use spawn::{PlannedThrow, SpawnController, WaveShape};
pub use state::{
    GameEvent, GameObject, GameOverSummary, GamePhase, GameState, ObjectId, ObjectKind,
    ObjectPool, SessionState, SlicePoint, SliceQuality, ThrowPattern,
};
pub use tick::{TickInput, tick};
pub use timer::Timer;
