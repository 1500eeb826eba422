//! Slice Surge - A slice-the-falling-objects arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (slice detection, scoring, difficulty, spawning)
//! - `game`: Host loop that drives the simulation and talks to collaborators
//! - `persistence`: Cross-session stats behind a key-value store
//! - `tuning`: Data-driven game balance
//! - `highscores`: Local top-10 leaderboard

pub mod error;
pub mod game;
pub mod highscores;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use error::{ConfigError, LeaderboardError};
pub use game::{Game, Leaderboard, LocalLeaderboard, SubmitReceipt};
pub use highscores::HighScores;
pub use persistence::{MemoryStore, ProgressStats, Store};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield dimensions (logical pixels, y grows downward)
    pub const FIELD_WIDTH: f32 = 1280.0;
    pub const FIELD_HEIGHT: f32 = 720.0;

    /// Guard for degenerate segment lengths
    pub const GEOMETRY_EPSILON: f32 = 1e-6;
}

/// Center of the playfield
#[inline]
pub fn field_center() -> Vec2 {
    Vec2::new(consts::FIELD_WIDTH / 2.0, consts::FIELD_HEIGHT / 2.0)
}

/// Linear interpolation from `a` to `b` by `t`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Quadratic ease-in-out on [0, 1]
#[inline]
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_in_out_quad_endpoints() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert!((ease_in_out_quad(1.0) - 1.0).abs() < 1e-6);
        assert!((ease_in_out_quad(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(10.0, 20.0, 0.0), 10.0);
        assert_eq!(lerp(10.0, 20.0, 1.0), 20.0);
        assert_eq!(lerp(10.0, 20.0, 0.25), 12.5);
    }
}
