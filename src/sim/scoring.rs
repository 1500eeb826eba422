//! Slice resolution and scoring
//!
//! Takes the objects cut by one segment and turns them into score, combo,
//! streak and stats updates. Bombs end the run. A golden object starts the
//! golden event. Normal objects are scored one by one, but all of them are
//! judged against the state from before the segment. Points are floored per
//! object when they are added to the score.

use glam::Vec2;

use super::golden;
use super::modes;
use super::state::{GameEvent, GameState, ObjectId, ObjectKind, SliceQuality};
use crate::field_center;
use crate::tuning::Tuning;

/// Perfect if the previous slice was recent enough, or the cut is near center
pub fn classify(tuning: &Tuning, last_slice_ms: Option<f64>, now_ms: f64, pos: Vec2) -> SliceQuality {
    let timely = last_slice_ms.is_some_and(|last| now_ms - last < tuning.perfect_window_ms);
    let central = pos.distance(field_center()) < tuning.perfect_zone_radius;
    if timely || central {
        SliceQuality::Perfect
    } else {
        SliceQuality::Normal
    }
}

/// Composite multiplier; every active bonus multiplies in
pub fn multiplier(tuning: &Tuning, combo: u32, quality: SliceQuality, frenzy: bool) -> f64 {
    let mut mult = 1.0;
    if combo > 1 {
        mult *= tuning.combo_multiplier;
    }
    if quality == SliceQuality::Perfect {
        mult *= tuning.perfect_multiplier;
    }
    if frenzy {
        mult *= tuning.frenzy_multiplier;
    }
    mult
}

/// Floored points for one object
#[inline]
pub fn points_for(base: u32, mult: f64) -> u64 {
    (base as f64 * mult).floor().max(0.0) as u64
}

/// Resolve every object cut by one segment
///
/// Ids that repeat, or that point at objects already sliced or released, are
/// ignored, so overlapping passes can never award an object twice.
pub fn resolve_cuts(state: &mut GameState, cuts: &[ObjectId]) {
    if state.is_game_over() {
        return;
    }

    let mut fresh: Vec<(ObjectId, ObjectKind, Vec2)> = Vec::with_capacity(cuts.len());
    for &id in cuts {
        if fresh.iter().any(|(seen, _, _)| *seen == id) {
            continue;
        }
        if let Some(obj) = state.pool.get(id).filter(|o| o.is_sliceable()) {
            fresh.push((id, obj.kind, obj.pos));
        }
    }
    if fresh.is_empty() {
        return;
    }

    if let Some(&(id, _, pos)) = fresh.iter().find(|(_, k, _)| *k == ObjectKind::Bomb) {
        log::info!("Bomb sliced at ({:.0}, {:.0})", pos.x, pos.y);
        state.emit(GameEvent::BombHit { pos });
        state.pool.release(id);
        state.game_over();
        return;
    }

    let normals: Vec<(ObjectId, u32, Vec2)> = fresh
        .iter()
        .filter_map(|&(id, kind, pos)| match kind {
            ObjectKind::Normal { points, .. } => Some((id, points, pos)),
            _ => None,
        })
        .collect();
    if !normals.is_empty() {
        score_normals(state, &normals);
    }

    if let Some(&(id, _, _)) = fresh.iter().find(|(_, k, _)| *k == ObjectKind::Golden) {
        golden::start(state, id);
    }
}

fn score_normals(state: &mut GameState, normals: &[(ObjectId, u32, Vec2)]) {
    let now = state.clock_ms;
    let prior_slice_ms = state.session.last_slice_ms;
    let count = normals.len() as u32;

    // Combo counts this segment before any multiplier is applied
    state.session.combo += count;
    state.session.max_combo = state.session.max_combo.max(state.session.combo);
    state.session.combo_timer.restart(now, state.tuning.combo_window_ms);
    state.emit(GameEvent::ComboUpdated {
        combo: state.session.combo,
    });

    let frenzy = state.session.frenzy_active();
    for &(id, base, pos) in normals {
        let juice_color = match state.pool.get_mut(id) {
            Some(obj) => {
                obj.sliced = true;
                obj.juice_color
            }
            None => continue,
        };

        let quality = classify(&state.tuning, prior_slice_ms, now, pos);
        let mult = multiplier(&state.tuning, state.session.combo, quality, frenzy);
        let points = points_for(base, mult);
        state.add_score(points);
        state.emit(GameEvent::ObjectSliced {
            id,
            pos,
            points,
            quality,
            juice_color,
        });

        if quality == SliceQuality::Perfect {
            state.session.perfect_slices += 1;
            state.session.perfect_streak += 1;
            state.emit(GameEvent::PerfectSlice { pos });
            if state.session.perfect_streak > state.stats.best_perfect_streak {
                state.stats.best_perfect_streak = state.session.perfect_streak;
            }
        } else {
            state.session.perfect_streak = 0;
        }

        state.bump_streak();
        state.difficulty.record_outcome(true);
        state.session.total_sliced += 1;
        state.stats.total_sliced += 1;
        state.stats_dirty = true;
        advance_chain(state, quality);
        modes::roll_activation(state);
    }
    state.session.last_slice_ms = Some(now);

    if count >= state.tuning.spectacular_threshold {
        let bonus = count as u64 * state.tuning.spectacular_bonus_per_object as u64;
        state.session.spectacular_slices += 1;
        state.add_score(bonus);
        state.emit(GameEvent::SpectacularSlice { count, bonus });
    }

    if !frenzy && state.session.combo >= state.tuning.frenzy_threshold {
        let duration_ms = state.tuning.frenzy_duration_ms;
        state.session.frenzy_timer.restart(now, duration_ms);
        log::info!("Frenzy started at combo {}", state.session.combo);
        state.emit(GameEvent::FrenzyStarted { duration_ms });
    }
}

/// Chain progress: 1 per slice, 2 extra for a perfect one
fn advance_chain(state: &mut GameState, quality: SliceQuality) {
    let session = &mut state.session;
    session.chain_progress += 1;
    if quality == SliceQuality::Perfect {
        session.chain_progress += 2;
    }
    if session.chain_progress >= session.chain_level * state.tuning.chain_base_progress {
        session.chain_level += 1;
        session.chain_progress = 0;
        let level = session.chain_level;
        state.emit(GameEvent::ChainLevelUp { level });
    }
}

/// Report a near miss for a segment that cut nothing
pub fn record_near_miss(state: &mut GameState, id: ObjectId, pos: Vec2) {
    if state.swipe.mark_near_miss(id) {
        state.session.near_misses += 1;
        state.emit(GameEvent::NearMiss { id, pos });
    }
}

/// Expire combo and frenzy once their timers lapse
pub fn update_timers(state: &mut GameState) {
    let now = state.clock_ms;
    if state.session.combo_timer.poll(now) && state.session.combo > 0 {
        state.session.combo = 0;
        state.emit(GameEvent::ComboUpdated { combo: 0 });
    }
    if state.session.frenzy_timer.poll(now) {
        log::info!("Frenzy ended");
        state.emit(GameEvent::FrenzyEnded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Place a normal object at `pos` worth `points`
    fn place(state: &mut GameState, pos: Vec2, points: u32) -> ObjectId {
        let id = state.pool.acquire().unwrap();
        let obj = state.pool.get_mut(id).unwrap();
        obj.pos = pos;
        obj.radius = 40.0;
        obj.kind = ObjectKind::Normal { variety: 0, points };
        id
    }

    /// Far from the center so only timing can make a slice perfect
    const OFF_CENTER: Vec2 = Vec2::new(100.0, 100.0);

    #[test]
    fn test_multiplier_composition_floors_exactly() {
        let tuning = Tuning::default();
        let m = multiplier(&tuning, 2, SliceQuality::Perfect, false);
        assert_eq!(points_for(10, m), 14);
        let m = multiplier(&tuning, 2, SliceQuality::Perfect, true);
        assert_eq!(points_for(10, m), 29);
        assert_eq!(multiplier(&tuning, 1, SliceQuality::Normal, false), 1.0);
    }

    #[test]
    fn test_classify_timing_and_zone() {
        let tuning = Tuning::default();
        assert_eq!(classify(&tuning, None, 1000.0, OFF_CENTER), SliceQuality::Normal);
        assert_eq!(
            classify(&tuning, Some(900.0), 1000.0, OFF_CENTER),
            SliceQuality::Perfect
        );
        assert_eq!(
            classify(&tuning, Some(600.0), 1000.0, OFF_CENTER),
            SliceQuality::Normal
        );
        assert_eq!(
            classify(&tuning, None, 1000.0, field_center()),
            SliceQuality::Perfect
        );
    }

    #[test]
    fn test_first_then_perfect_slice() {
        let mut state = GameState::new(1);
        let a = place(&mut state, OFF_CENTER, 10);
        let b = place(&mut state, Vec2::new(150.0, 120.0), 10);

        state.clock_ms = 500.0;
        resolve_cuts(&mut state, &[a]);
        assert_eq!(state.session.score, 10);
        assert_eq!(state.session.combo, 1);

        state.clock_ms = 600.0;
        resolve_cuts(&mut state, &[b]);
        assert_eq!(state.session.combo, 2);
        assert_eq!(state.session.score, 10 + 14);
        assert_eq!(state.session.perfect_slices, 1);
        assert_eq!(state.session.slice_streak, 2);
    }

    #[test]
    fn test_no_double_award() {
        let mut state = GameState::new(1);
        let a = place(&mut state, OFF_CENTER, 10);
        resolve_cuts(&mut state, &[a, a]);
        resolve_cuts(&mut state, &[a]);
        assert_eq!(state.session.score, 10);
        assert_eq!(state.session.combo, 1);
        assert_eq!(state.session.total_sliced, 1);
    }

    #[test]
    fn test_bomb_ends_run_without_scoring() {
        let mut state = GameState::new(1);
        let n = place(&mut state, OFF_CENTER, 10);
        let bomb = place(&mut state, Vec2::new(120.0, 100.0), 0);
        state.pool.get_mut(bomb).unwrap().kind = ObjectKind::Bomb;
        state.drain_events();

        resolve_cuts(&mut state, &[n, bomb]);
        assert!(state.is_game_over());
        assert_eq!(state.session.score, 0);
        assert!(state.pool.get(bomb).is_none());
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::BombHit { .. })));
    }

    #[test]
    fn test_spectacular_bonus() {
        let mut state = GameState::new(1);
        let ids: Vec<_> = (0..3)
            .map(|i| place(&mut state, Vec2::new(100.0 + i as f32 * 60.0, 100.0), 10))
            .collect();
        state.clock_ms = 100.0;
        resolve_cuts(&mut state, &ids);
        // combo 3 applies the combo multiplier: floor(10 * 1.05) each
        assert_eq!(state.session.score, 3 * 10 + 150);
        assert_eq!(state.session.spectacular_slices, 1);
    }

    #[test]
    fn test_combo_expires_once() {
        let mut state = GameState::new(1);
        let a = place(&mut state, OFF_CENTER, 10);
        resolve_cuts(&mut state, &[a]);
        state.drain_events();

        state.clock_ms = state.tuning.combo_window_ms - 1.0;
        update_timers(&mut state);
        assert_eq!(state.session.combo, 1);

        state.clock_ms = state.tuning.combo_window_ms;
        update_timers(&mut state);
        state.clock_ms += 5000.0;
        update_timers(&mut state);
        assert_eq!(state.session.combo, 0);
        let resets = state
            .drain_events()
            .into_iter()
            .filter(|e| *e == GameEvent::ComboUpdated { combo: 0 })
            .count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_frenzy_starts_at_threshold_and_ends() {
        let mut state = GameState::new(1);
        let ids: Vec<_> = (0..10)
            .map(|i| place(&mut state, Vec2::new(60.0 * i as f32, 40.0), 10))
            .collect();
        resolve_cuts(&mut state, &ids);
        assert!(state.session.frenzy_active());

        state.clock_ms = state.tuning.frenzy_duration_ms;
        state.drain_events();
        update_timers(&mut state);
        assert!(!state.session.frenzy_active());
        assert!(state.drain_events().contains(&GameEvent::FrenzyEnded));
    }

    #[test]
    fn test_chain_levels_up() {
        let mut state = GameState::new(1);
        for i in 0..10 {
            let id = place(&mut state, OFF_CENTER, 10);
            // Spaced out so nothing is perfect
            state.clock_ms = 1000.0 * (i + 1) as f64;
            resolve_cuts(&mut state, &[id]);
            state.pool.release(id);
        }
        assert_eq!(state.session.chain_level, 2);
        assert_eq!(state.session.chain_progress, 0);
    }

    proptest! {
        #[test]
        fn prop_score_never_decreases(
            cuts in proptest::collection::vec((0u32..40, 0.0f64..2000.0, 0u32..5), 1..40),
        ) {
            let mut state = GameState::new(7);
            let mut prev = 0u64;
            for (points, gap, extra) in cuts {
                state.clock_ms += gap;
                let ids: Vec<_> = (0..=extra)
                    .filter_map(|i| {
                        let id = state.pool.acquire()?;
                        let obj = state.pool.get_mut(id)?;
                        obj.pos = Vec2::new(50.0 + 40.0 * i as f32, 50.0);
                        obj.kind = ObjectKind::Normal { variety: 0, points };
                        Some(id)
                    })
                    .collect();
                resolve_cuts(&mut state, &ids);
                update_timers(&mut state);
                prop_assert!(state.session.score >= prev);
                prev = state.session.score;
                for id in ids {
                    state.pool.release(id);
                }
            }
        }
    }
}
