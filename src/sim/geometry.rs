//! Geometry helpers for slice detection
//!
//! Swipes are line segments between consecutive pointer samples; objects are
//! circles. The only hard case is a zero-length segment, which degrades to a
//! point test around the segment end.

use glam::Vec2;
use rand::Rng;

use crate::consts::GEOMETRY_EPSILON;

/// Closest point on segment `a → b` to `p`
///
/// A degenerate segment (a ≈ b) returns `b`.
pub fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let seg = b - a;
    let len_sq = seg.length_squared();
    if len_sq < GEOMETRY_EPSILON {
        return b;
    }
    let t = ((p - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    a + seg * t
}

/// Distance from `p` to the segment `a → b`
#[inline]
pub fn segment_distance(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (p - closest_point_on_segment(a, b, p)).length()
}

/// True if the segment passes within `radius` of `center`
#[inline]
pub fn segment_hits_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> bool {
    segment_distance(a, b, center) <= radius
}

/// Pick an index by weight: draw in [0, total), walk cumulative sums
///
/// Returns `None` when every weight is zero.
pub fn weighted_pick<R: Rng + ?Sized>(rng: &mut R, weights: &[u32]) -> Option<usize> {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let draw = rng.random_range(0..total);
    Some(pick_with_draw(weights, draw))
}

/// Cumulative walk for a given draw; the first bucket whose running sum
/// exceeds the draw wins
pub fn pick_with_draw(weights: &[u32], draw: u32) -> usize {
    let mut cumulative = 0u32;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if draw < cumulative {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_closest_point_interior() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(100.0, 0.0);
        let p = Vec2::new(40.0, 30.0);
        let c = closest_point_on_segment(a, b, p);
        assert!((c - Vec2::new(40.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_closest_point_clamps_to_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(100.0, 0.0);
        assert_eq!(closest_point_on_segment(a, b, Vec2::new(-50.0, 10.0)), a);
        assert_eq!(closest_point_on_segment(a, b, Vec2::new(150.0, 10.0)), b);
    }

    #[test]
    fn test_segment_crossing_circle_hits_even_if_endpoints_far() {
        // Fast swipe: both samples are far outside the circle
        let a = Vec2::new(-200.0, 0.0);
        let b = Vec2::new(200.0, 0.0);
        assert!(segment_hits_circle(a, b, Vec2::new(0.0, 20.0), 30.0));
        assert!(!segment_hits_circle(a, b, Vec2::new(0.0, 40.0), 30.0));
    }

    #[test]
    fn test_degenerate_segment_falls_back_to_point() {
        let a = Vec2::new(10.0, 10.0);
        assert!(segment_hits_circle(a, a, Vec2::new(15.0, 10.0), 6.0));
        assert!(!segment_hits_circle(a, a, Vec2::new(30.0, 10.0), 6.0));
        // Pointer exactly on the center
        assert!(segment_hits_circle(a, a, a, 1.0));
    }

    #[test]
    fn test_pick_with_draw_boundaries() {
        let weights = [100, 80, 2];
        assert_eq!(pick_with_draw(&weights, 0), 0);
        assert_eq!(pick_with_draw(&weights, 99), 0);
        assert_eq!(pick_with_draw(&weights, 100), 1);
        assert_eq!(pick_with_draw(&weights, 179), 1);
        assert_eq!(pick_with_draw(&weights, 180), 2);
        assert_eq!(pick_with_draw(&weights, 181), 2);
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(weighted_pick(&mut rng, &[0, 5, 0]), Some(1));
        }
        assert_eq!(weighted_pick(&mut rng, &[0, 0]), None);
    }

    proptest! {
        #[test]
        fn prop_segment_distance_never_nan(
            ax in -2000.0f32..2000.0, ay in -2000.0f32..2000.0,
            dx in -1e-4f32..1e-4, dy in -1e-4f32..1e-4,
            px in -2000.0f32..2000.0, py in -2000.0f32..2000.0,
        ) {
            let a = Vec2::new(ax, ay);
            let b = a + Vec2::new(dx, dy);
            let d = segment_distance(a, b, Vec2::new(px, py));
            prop_assert!(d.is_finite());
        }

        #[test]
        fn prop_closest_point_no_farther_than_endpoints(
            ax in -500.0f32..500.0, ay in -500.0f32..500.0,
            bx in -500.0f32..500.0, by in -500.0f32..500.0,
            px in -500.0f32..500.0, py in -500.0f32..500.0,
        ) {
            let (a, b, p) = (Vec2::new(ax, ay), Vec2::new(bx, by), Vec2::new(px, py));
            let d = segment_distance(a, b, p);
            prop_assert!(d <= p.distance(a) + 1e-2);
            prop_assert!(d <= p.distance(b) + 1e-2);
        }
    }
}
