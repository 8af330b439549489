/*
 * Vector Math Module
 *
 * Small helpers on top of nannou's `Vec2` that mirror the steering
 * vocabulary used throughout the simulation: limiting a vector to a
 * maximum magnitude, rescaling it to an exact magnitude, measuring the
 * bearing between two directions and computing toroidal deltas.
 */

use nannou::prelude::Vec2;

// Clamp the magnitude of `v` to at most `max`
#[inline]
pub fn limit(v: Vec2, max: f32) -> Vec2 {
    let length_squared = v.length_squared();
    if length_squared > max * max && length_squared > 0.0 {
        v * (max / length_squared.sqrt())
    } else {
        v
    }
}

// Rescale `v` to exactly `magnitude`; the zero vector stays zero
#[inline]
pub fn set_mag(v: Vec2, magnitude: f32) -> Vec2 {
    let length_squared = v.length_squared();
    if length_squared > 0.0 {
        v * (magnitude / length_squared.sqrt())
    } else {
        Vec2::ZERO
    }
}

// Unit vector in the direction of `v`, or zero
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    set_mag(v, 1.0)
}

/// Unsigned angle in radians between two directions, in `[0, PI]`.
///
/// Either vector being zero yields `0.0`.
#[inline]
pub fn angle_between(a: Vec2, b: Vec2) -> f32 {
    if a.length_squared() == 0.0 || b.length_squared() == 0.0 {
        return 0.0;
    }
    let cross = a.x * b.y - a.y * b.x;
    cross.atan2(a.dot(b)).abs()
}

// Minimum-image correction of a single axis delta on a torus of size `extent`
#[inline]
pub fn wrap_axis(delta: f32, extent: f32) -> f32 {
    if delta.abs() > extent / 2.0 {
        if delta > 0.0 {
            delta - extent
        } else {
            delta + extent
        }
    } else {
        delta
    }
}

// Shortest vector from `from` to `to` on a `width` x `height` torus
#[inline]
pub fn wrapped_delta(from: Vec2, to: Vec2, width: f32, height: f32) -> Vec2 {
    let delta = to - from;
    Vec2::new(wrap_axis(delta.x, width), wrap_axis(delta.y, height))
}

// A world extent or cell size that can be sampled and bucketed
#[inline]
pub fn is_valid_extent(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

// Linear interpolation between two points
#[inline]
pub fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn limit_only_shrinks() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(limit(v, 10.0), v);
        let limited = limit(v, 1.0);
        assert!((limited.length() - 1.0).abs() < 1e-6);
        assert_eq!(limit(Vec2::ZERO, 1.0), Vec2::ZERO);
    }

    #[test]
    fn set_mag_keeps_zero_vector() {
        assert_eq!(set_mag(Vec2::ZERO, 4.0), Vec2::ZERO);
        assert!((set_mag(Vec2::new(0.0, 0.5), 4.0).y - 4.0).abs() < 1e-6);
    }

    #[test]
    fn angle_between_is_unsigned() {
        let right = Vec2::new(1.0, 0.0);
        assert!((angle_between(right, Vec2::new(0.0, 1.0)) - PI / 2.0).abs() < 1e-6);
        assert!((angle_between(right, Vec2::new(0.0, -1.0)) - PI / 2.0).abs() < 1e-6);
        assert!((angle_between(right, Vec2::new(-1.0, 0.0)) - PI).abs() < 1e-6);
        assert_eq!(angle_between(Vec2::ZERO, right), 0.0);
    }

    #[test]
    fn wrapped_delta_takes_short_way_round() {
        let delta = wrapped_delta(Vec2::new(1.0, 1.0), Vec2::new(798.0, 598.0), 800.0, 600.0);
        assert!((delta.x + 3.0).abs() < 1e-4);
        assert!((delta.y + 3.0).abs() < 1e-4);

        let direct = wrapped_delta(Vec2::new(100.0, 100.0), Vec2::new(150.0, 90.0), 800.0, 600.0);
        assert_eq!(direct, Vec2::new(50.0, -10.0));
    }
}
