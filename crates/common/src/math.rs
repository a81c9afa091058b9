use glam::Vec2;

/// Closest point to `p` on the segment `[a, b]`.
///
/// A degenerate segment (`a == b`) collapses to `a`.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sqr = ab.length_squared();
    if len_sqr <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sqr).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point to `p` inside the axis-aligned box `[min, max]`.
pub fn aabb_closest_point(p: Vec2, min: Vec2, max: Vec2) -> Vec2 {
    p.clamp(min, max)
}

/// Angle of a direction vector in radians, measured from +X counter-clockwise.
pub fn vector_angle(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x)
}

/// Hermite ease between two edges, saturating outside them.
///
/// Equal edges degrade to a step function at `edge0`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 == edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn closest_point_interior_projection() {
        let p = closest_point_on_segment(Vec2::new(1.0, 5.0), Vec2::ZERO, Vec2::new(4.0, 0.0));
        assert_eq!(p, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn closest_point_clamps_to_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(2.0, 2.0);
        assert_eq!(closest_point_on_segment(Vec2::new(-3.0, -1.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec2::new(9.0, 4.0), a, b), b);
    }

    #[test]
    fn closest_point_on_degenerate_segment() {
        let a = Vec2::new(1.0, 1.0);
        assert_eq!(closest_point_on_segment(Vec2::new(5.0, 0.0), a, a), a);
    }

    #[test]
    fn aabb_clamps_outside_points() {
        let p = aabb_closest_point(Vec2::new(3.0, -2.0), Vec2::ZERO, Vec2::ONE);
        assert_eq!(p, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn angle_of_axes() {
        assert_eq!(vector_angle(Vec2::X), 0.0);
        assert!((vector_angle(Vec2::Y) - FRAC_PI_2).abs() < 1e-6);
        assert!((vector_angle(-Vec2::X) - PI).abs() < 1e-6);
    }

    #[test]
    fn smoothstep_saturates_and_eases() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert!(smoothstep(0.0, 1.0, 0.25) < 0.25);
    }

    #[test]
    fn smoothstep_with_equal_edges_is_a_step() {
        assert_eq!(smoothstep(0.3, 0.3, 0.2), 0.0);
        assert_eq!(smoothstep(0.3, 0.3, 0.3), 1.0);
    }
}
