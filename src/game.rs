//! Host loop
//!
//! Owns a session and its collaborators. Frame time is accumulated and spent in
//! fixed simulation steps; pointer input queued between frames is delivered to
//! the first step. After stepping, dirty stats are written back, and a finished
//! run saves the local high scores and is submitted to the leaderboard exactly
//! once.

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::LeaderboardResult;
use crate::highscores::HighScores;
use crate::persistence::{ProgressStats, Store};
use crate::sim::{GameEvent, GameState, PointerEvent, TickInput, tick};
use crate::tuning::Tuning;

/// Leaderboard reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub success: bool,
    pub is_high_score: bool,
}

/// Remote score submission collaborator
pub trait Leaderboard {
    fn submit(&mut self, score: u64) -> LeaderboardResult<SubmitReceipt>;
}

/// Leaderboard that only remembers the best score it has seen
#[derive(Debug, Clone, Default)]
pub struct LocalLeaderboard {
    best: u64,
}

impl Leaderboard for LocalLeaderboard {
    fn submit(&mut self, score: u64) -> LeaderboardResult<SubmitReceipt> {
        let is_high_score = score > self.best;
        self.best = self.best.max(score);
        Ok(SubmitReceipt {
            success: true,
            is_high_score,
        })
    }
}

/// Game instance holding the session and its collaborators
pub struct Game<S: Store, L: Leaderboard> {
    pub state: GameState,
    tuning: Tuning,
    store: S,
    leaderboard: L,
    accumulator: f32,
    input: TickInput,
    /// Game over already reported to the collaborators
    submitted: bool,
    last_receipt: Option<SubmitReceipt>,
}

impl<S: Store, L: Leaderboard> Game<S, L> {
    /// Start a session with stats and high scores read from `store`
    pub fn new(seed: u64, tuning: Tuning, store: S, leaderboard: L) -> Self {
        let high_scores = HighScores::load(&store);
        let stats = ProgressStats::load(&store);
        Self {
            state: GameState::with_context(seed, tuning.clone(), high_scores, stats),
            tuning,
            store,
            leaderboard,
            accumulator: 0.0,
            input: TickInput::default(),
            submitted: false,
            last_receipt: None,
        }
    }

    /// Queue a pointer sample for the next step
    pub fn pointer(&mut self, event: PointerEvent) {
        self.input.pointer.push(event);
    }

    pub fn toggle_pause(&mut self) {
        self.input.pause = true;
    }

    pub fn idle_mode(&self) -> bool {
        self.input.idle_mode
    }

    pub fn set_idle_mode(&mut self, idle: bool) {
        self.input.idle_mode = idle;
    }

    /// Count today toward the daily streak
    pub fn record_play_day(&mut self, today: i64) {
        if self.state.stats.touch_day(today) {
            self.state.stats_dirty = true;
            log::info!("Daily streak: {}", self.state.stats.daily_streak);
        }
    }

    /// Run simulation ticks for `dt` seconds of frame time; returns new events
    pub fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &self.input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.pointer.clear();
            self.input.pause = false;
        }

        self.flush_stats();
        if self.state.is_game_over() && !self.submitted {
            self.report_game_over();
        }
        self.state.drain_events()
    }

    fn flush_stats(&mut self) {
        if self.state.stats_dirty {
            self.state.stats.save(&mut self.store);
            self.state.stats_dirty = false;
        }
    }

    fn report_game_over(&mut self) {
        self.submitted = true;
        self.state.high_scores.save(&mut self.store);
        let score = self.state.session.score;
        match self.leaderboard.submit(score) {
            Ok(receipt) => {
                log::info!(
                    "Leaderboard accepted score {} (high score: {})",
                    score,
                    receipt.is_high_score
                );
                self.last_receipt = Some(receipt);
            }
            Err(e) => log::warn!("Leaderboard submission failed: {}", e),
        }
    }

    /// Reply to the most recent leaderboard submission
    pub fn last_receipt(&self) -> Option<SubmitReceipt> {
        self.last_receipt
    }

    /// Reset game state for restart; progress and high scores carry over
    pub fn restart(&mut self, seed: u64) {
        let high_scores = self.state.high_scores.clone();
        let stats = self.state.stats.clone();
        self.state = GameState::with_context(seed, self.tuning.clone(), high_scores, stats);
        self.accumulator = 0.0;
        let idle_mode = self.input.idle_mode;
        self.input = TickInput {
            idle_mode,
            ..Default::default()
        };
        self.submitted = false;
        self.last_receipt = None;
        log::info!("Game restarted with seed: {}", seed);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn leaderboard(&self) -> &L {
        &self.leaderboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LeaderboardError;
    use crate::persistence::MemoryStore;
    use crate::sim::ObjectKind;
    use glam::Vec2;

    #[derive(Default)]
    struct CountingLeaderboard {
        calls: u32,
        fail: bool,
    }

    impl Leaderboard for CountingLeaderboard {
        fn submit(&mut self, _score: u64) -> LeaderboardResult<SubmitReceipt> {
            self.calls += 1;
            if self.fail {
                Err(LeaderboardError::Unavailable)
            } else {
                Ok(SubmitReceipt {
                    success: true,
                    is_high_score: true,
                })
            }
        }
    }

    fn game(fail: bool) -> Game<MemoryStore, CountingLeaderboard> {
        Game::new(
            7,
            Tuning::default(),
            MemoryStore::default(),
            CountingLeaderboard { calls: 0, fail },
        )
    }

    #[test]
    fn test_substeps_are_capped() {
        let mut g = game(false);
        g.update(1.0);
        assert_eq!(g.state.time_ticks, MAX_SUBSTEPS as u64);
    }

    #[test]
    fn test_queued_pointer_input_slices() {
        let mut g = game(false);
        let id = g.state.pool.acquire().unwrap();
        {
            let obj = g.state.pool.get_mut(id).unwrap();
            obj.pos = Vec2::new(200.0, 200.0);
            obj.kind = ObjectKind::Normal {
                variety: 0,
                points: 10,
            };
        }
        g.pointer(PointerEvent::Down(Vec2::new(100.0, 200.0)));
        g.pointer(PointerEvent::Move(Vec2::new(300.0, 200.0)));
        g.pointer(PointerEvent::Up);
        let events = g.update(SIM_DT);
        assert_eq!(g.state.session.score, 10);
        assert!(events.contains(&GameEvent::ScoreUpdated { score: 10 }));

        // Stats were written back after the slice
        let stats = ProgressStats::load(g.store());
        assert_eq!(stats.total_sliced, 1);
    }

    #[test]
    fn test_game_over_submits_once_and_saves_high_scores() {
        let mut g = game(false);
        g.state.add_score(77);
        g.state.game_over();
        g.update(SIM_DT);
        g.update(SIM_DT);
        assert_eq!(g.leaderboard().calls, 1);
        assert_eq!(HighScores::load(g.store()).top_score(), Some(77));
        assert_eq!(ProgressStats::load(g.store()).personal_best, 77);
        assert!(g.last_receipt().is_some());
    }

    #[test]
    fn test_leaderboard_failure_is_not_fatal() {
        let mut g = game(true);
        g.state.add_score(5);
        g.state.game_over();
        let events = g.update(SIM_DT);
        assert_eq!(g.leaderboard().calls, 1);
        assert!(g.last_receipt().is_none());
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver(_))));
    }

    #[test]
    fn test_restart_keeps_progress() {
        let mut g = game(false);
        g.state.add_score(40);
        g.state.game_over();
        g.update(SIM_DT);
        g.restart(8);
        assert!(!g.state.is_game_over());
        assert_eq!(g.state.session.score, 0);
        assert_eq!(g.state.high_scores.top_score(), Some(40));
        assert_eq!(g.state.stats.personal_best, 40);

        g.state.game_over();
        g.update(SIM_DT);
        assert_eq!(g.leaderboard().calls, 2);
    }

    #[test]
    fn test_pause_toggle_freezes_session() {
        let mut g = game(false);
        g.update(SIM_DT);
        g.toggle_pause();
        g.update(SIM_DT);
        let clock = g.state.clock_ms;
        g.update(0.05);
        assert!(g.state.is_paused());
        assert_eq!(g.state.clock_ms, clock);
    }

    #[test]
    fn test_daily_streak_marks_stats_dirty() {
        let mut g = game(false);
        g.record_play_day(19_000);
        g.update(0.0);
        assert_eq!(ProgressStats::load(g.store()).daily_streak, 1);
    }

    #[test]
    fn test_local_leaderboard_tracks_best() {
        let mut board = LocalLeaderboard::default();
        assert!(board.submit(10).unwrap().is_high_score);
        assert!(!board.submit(5).unwrap().is_high_score);
        assert!(board.submit(11).unwrap().is_high_score);
    }
}
