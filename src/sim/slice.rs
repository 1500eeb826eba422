//! Slice detection
//!
//! A swipe is the chain of raw pointer samples between pointer-down and
//! pointer-up. Every consecutive pair forms a segment, and each segment is
//! tested on its own: several move events may arrive in one tick and each one
//! must be able to cut. Objects within the effective radius of the segment are
//! cut together, with no ordering between them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{segment_distance, segment_hits_circle};
use super::state::{ObjectId, ObjectPool, SlicePoint};
use crate::consts::SIM_DT;
use crate::tuning::Tuning;

/// Raw pointer input, in playfield coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up,
}

/// Current stroke and its short trail history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwipeTracker {
    /// Pointer is down
    pub slicing: bool,
    /// Most recent sample of the stroke
    pub last: Option<SlicePoint>,
    /// Samples from the last `trail_window_ms`, oldest first
    pub trail: Vec<SlicePoint>,
    /// Segment formed by the latest move sample
    pub segment: Option<(Vec2, Vec2)>,
    /// Objects already reported as near misses during this stroke
    near_missed: Vec<ObjectId>,
}

impl SwipeTracker {
    /// Start a stroke at `pos`
    pub fn begin(&mut self, pos: Vec2, now_ms: f64) {
        let point = SlicePoint { pos, time_ms: now_ms };
        self.slicing = true;
        self.trail.clear();
        self.trail.push(point);
        self.last = Some(point);
        self.segment = None;
        self.near_missed.clear();
    }

    /// Extend the stroke; returns the new segment `(a, b)` if one was formed
    pub fn advance(&mut self, pos: Vec2, now_ms: f64, trail_window_ms: f64) -> Option<(Vec2, Vec2)> {
        if !self.slicing {
            return None;
        }
        let point = SlicePoint { pos, time_ms: now_ms };
        let prev = self.last.replace(point)?;
        self.trail.push(point);
        self.trail
            .retain(|p| now_ms - p.time_ms <= trail_window_ms);
        self.segment = Some((prev.pos, pos));
        self.segment
    }

    /// Finish the stroke (pointer up, pause or game over)
    pub fn end_stroke(&mut self) {
        self.slicing = false;
        self.last = None;
        self.trail.clear();
        self.segment = None;
        self.near_missed.clear();
    }

    /// Swipe speed over the trail (px/s)
    ///
    /// Samples that share a timestamp are measured against one tick so a burst
    /// of move events never divides by zero.
    pub fn speed(&self) -> f32 {
        let (Some(first), Some(last)) = (self.trail.first(), self.trail.last()) else {
            return 0.0;
        };
        let path: f32 = self
            .trail
            .windows(2)
            .map(|w| w[0].pos.distance(w[1].pos))
            .sum();
        let elapsed_ms = (last.time_ms - first.time_ms).max(SIM_DT as f64 * 1000.0);
        path / (elapsed_ms as f32 / 1000.0)
    }

    /// Record a near miss once per object per stroke; false if already seen
    pub fn mark_near_miss(&mut self, id: ObjectId) -> bool {
        if self.near_missed.contains(&id) {
            return false;
        }
        self.near_missed.push(id);
        true
    }
}

/// Hit radius for a swipe moving at `speed` px/s
pub fn effective_radius(tuning: &Tuning, speed: f32) -> f32 {
    let bonus = (speed.max(0.0) * tuning.speed_radius_factor).min(tuning.max_speed_bonus);
    tuning.base_hit_radius + bonus + tuning.magnet_radius
}

/// Objects cut by segment `a → b`
///
/// Already-sliced objects are skipped. With a `focus` object only that object
/// is considered.
pub fn detect_cuts(
    pool: &ObjectPool,
    a: Vec2,
    b: Vec2,
    radius: f32,
    focus: Option<ObjectId>,
) -> Vec<ObjectId> {
    pool.iter_active()
        .filter(|o| o.is_sliceable())
        .filter(|o| focus.is_none_or(|f| f == o.id))
        .filter(|o| segment_hits_circle(a, b, o.pos, radius))
        .map(|o| o.id)
        .collect()
}

/// Closest uncut object that the segment passed near without cutting
pub fn nearest_near_miss(
    pool: &ObjectPool,
    a: Vec2,
    b: Vec2,
    hit_radius: f32,
    near_radius: f32,
    focus: Option<ObjectId>,
) -> Option<(ObjectId, Vec2)> {
    pool.iter_active()
        .filter(|o| o.is_sliceable())
        .filter(|o| focus.is_none_or(|f| f == o.id))
        .map(|o| (o, segment_distance(a, b, o.pos)))
        .filter(|(_, d)| *d > hit_radius && *d <= near_radius)
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(o, _)| (o.id, o.pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::ObjectKind;

    fn pool_with(points: &[Vec2]) -> (ObjectPool, Vec<ObjectId>) {
        let mut pool = ObjectPool::new(8);
        let ids = points
            .iter()
            .map(|&p| {
                let id = pool.acquire().unwrap();
                let obj = pool.get_mut(id).unwrap();
                obj.pos = p;
                obj.radius = 40.0;
                obj.kind = ObjectKind::Normal {
                    variety: 0,
                    points: 10,
                };
                id
            })
            .collect();
        (pool, ids)
    }

    #[test]
    fn test_effective_radius_speed_bonus_is_clamped() {
        let tuning = Tuning::default();
        let slow = effective_radius(&tuning, 0.0);
        assert_eq!(slow, tuning.base_hit_radius + tuning.magnet_radius);
        let fast = effective_radius(&tuning, 1.0e9);
        assert_eq!(fast, slow + tuning.max_speed_bonus);
        assert!(effective_radius(&tuning, 500.0) > slow);
    }

    #[test]
    fn test_one_segment_cuts_every_object_it_crosses() {
        let (pool, ids) = pool_with(&[
            Vec2::new(100.0, 300.0),
            Vec2::new(300.0, 310.0),
            Vec2::new(300.0, 600.0),
        ]);
        let cuts = detect_cuts(
            &pool,
            Vec2::new(0.0, 300.0),
            Vec2::new(500.0, 300.0),
            60.0,
            None,
        );
        assert_eq!(cuts, vec![ids[0], ids[1]]);
    }

    #[test]
    fn test_sliced_objects_are_skipped() {
        let (mut pool, ids) = pool_with(&[Vec2::new(100.0, 100.0)]);
        pool.get_mut(ids[0]).unwrap().sliced = true;
        let cuts = detect_cuts(
            &pool,
            Vec2::new(0.0, 100.0),
            Vec2::new(200.0, 100.0),
            60.0,
            None,
        );
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_focus_excludes_other_objects() {
        let (pool, ids) = pool_with(&[Vec2::new(100.0, 100.0), Vec2::new(150.0, 100.0)]);
        let cuts = detect_cuts(
            &pool,
            Vec2::new(0.0, 100.0),
            Vec2::new(200.0, 100.0),
            60.0,
            Some(ids[1]),
        );
        assert_eq!(cuts, vec![ids[1]]);
    }

    #[test]
    fn test_zero_length_segment_is_point_test() {
        let (pool, ids) = pool_with(&[Vec2::new(100.0, 100.0)]);
        let p = Vec2::new(120.0, 100.0);
        assert_eq!(detect_cuts(&pool, p, p, 60.0, None), vec![ids[0]]);
        let far = Vec2::new(300.0, 100.0);
        assert!(detect_cuts(&pool, far, far, 60.0, None).is_empty());
    }

    #[test]
    fn test_near_miss_band() {
        let (pool, ids) = pool_with(&[Vec2::new(100.0, 180.0)]);
        let a = Vec2::new(0.0, 100.0);
        let b = Vec2::new(200.0, 100.0);
        assert!(detect_cuts(&pool, a, b, 62.0, None).is_empty());
        let near = nearest_near_miss(&pool, a, b, 62.0, 95.0, None);
        assert_eq!(near.map(|(id, _)| id), Some(ids[0]));
        assert!(nearest_near_miss(&pool, a, b, 62.0, 70.0, None).is_none());
    }

    #[test]
    fn test_tracker_segments_and_trail() {
        let mut swipe = SwipeTracker::default();
        assert!(swipe.advance(Vec2::ZERO, 0.0, 150.0).is_none(), "no stroke yet");

        swipe.begin(Vec2::new(0.0, 0.0), 0.0);
        let seg = swipe.advance(Vec2::new(10.0, 0.0), 10.0, 150.0);
        assert_eq!(seg, Some((Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0))));
        // Two moves in the same tick both form segments
        let seg = swipe.advance(Vec2::new(20.0, 0.0), 10.0, 150.0);
        assert_eq!(seg, Some((Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0))));

        swipe.advance(Vec2::new(30.0, 0.0), 500.0, 150.0);
        assert_eq!(swipe.trail.len(), 1, "old samples trimmed");

        swipe.end_stroke();
        assert!(swipe.advance(Vec2::new(40.0, 0.0), 510.0, 150.0).is_none());
    }

    #[test]
    fn test_speed_with_shared_timestamps_is_finite() {
        let mut swipe = SwipeTracker::default();
        swipe.begin(Vec2::ZERO, 100.0);
        swipe.advance(Vec2::new(50.0, 0.0), 100.0, 150.0);
        swipe.advance(Vec2::new(100.0, 0.0), 100.0, 150.0);
        let speed = swipe.speed();
        assert!(speed.is_finite());
        assert!(speed > 0.0);
    }

    #[test]
    fn test_near_miss_reported_once_per_stroke() {
        let mut swipe = SwipeTracker::default();
        swipe.begin(Vec2::ZERO, 0.0);
        assert!(swipe.mark_near_miss(ObjectId(3)));
        assert!(!swipe.mark_near_miss(ObjectId(3)));
        swipe.begin(Vec2::ZERO, 10.0);
        assert!(swipe.mark_near_miss(ObjectId(3)));
    }
}
