//! Scalar kernels shared by quad evaluation, inversion and extrapolation.
//!
//! All kernels take the four corner values in `(v00, v10, v01, v11)` order,
//! where the first digit is the x offset and the second the y offset inside
//! the quad, and local coordinates `(u, v)` that may lie outside `[0, 1]`.

use std::f64::consts::SQRT_2;

/// Bilinear blend of four corner values.
#[inline]
pub fn bilinear(v00: f64, v10: f64, v01: f64, v11: f64, u: f64, v: f64) -> f64 {
    v00 * (u - 1.0) * (v - 1.0) - v10 * u * (v - 1.0) - v01 * (u - 1.0) * v + v11 * u * v
}

/// Partial derivatives `(d/du, d/dv)` of [`bilinear`].
#[inline]
pub fn bilinear_gradient(v00: f64, v10: f64, v01: f64, v11: f64, u: f64, v: f64) -> (f64, f64) {
    let du = (v10 - v00) * (1.0 - v) + (v11 - v01) * v;
    let dv = (v01 - v00) * (1.0 - u) + (v11 - v10) * u;
    (du, dv)
}

/// First-order planar extrapolation through the quad centre using the mean
/// edge gradients along each axis.
#[inline]
pub fn planar(v00: f64, v10: f64, v01: f64, v11: f64, u: f64, v: f64) -> f64 {
    let grad_u = 0.5 * ((v10 - v00) + (v11 - v01));
    let grad_v = 0.5 * ((v01 - v00) + (v11 - v10));
    let mean = 0.25 * (v00 + v10 + v01 + v11);
    grad_u * (u - 0.5) + grad_v * (v - 0.5) + mean
}

/// Euclidean distance from `(u, v)` to the unit square, 0 inside.
pub fn outside_distance(u: f64, v: f64) -> f64 {
    let du = if u >= 1.0 {
        u - 1.0
    } else if u < 0.0 {
        -u
    } else {
        0.0
    };
    let dv = if v >= 1.0 {
        v - 1.0
    } else if v < 0.0 {
        -v
    } else {
        0.0
    };
    match (du > 0.0, dv > 0.0) {
        (true, true) => du.hypot(dv),
        (true, false) => du,
        (false, true) => dv,
        (false, false) => 0.0,
    }
}

/// Near/far blend factor: 0 inside the unit square, 1 at one cell or more.
#[inline]
pub fn blend_factor(u: f64, v: f64) -> f64 {
    outside_distance(u, v).min(1.0)
}

/// Inverse-distance weight of a neighbour quad at offset `(dx, dy)`.
///
/// The zero offset gets `sqrt(2)` instead of an infinite weight.
#[inline]
pub fn neighbor_weight(dx: i64, dy: i64) -> f64 {
    if dx == 0 && dy == 0 {
        SQRT_2
    } else {
        1.0 / (dx as f64).hypot(dy as f64)
    }
}

#[inline]
pub fn min4(a: f32, b: f32, c: f32, d: f32) -> f32 {
    a.min(b).min(c.min(d))
}

/// `2^level` as a float.
#[inline]
pub fn level_scale(level: u32) -> f64 {
    (1u64 << level) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn bilinear_hits_corners_and_centre() {
        let (a, b, c, d) = (1.0, 3.0, 5.0, 11.0);
        assert!((bilinear(a, b, c, d, 0.0, 0.0) - a).abs() < EPS);
        assert!((bilinear(a, b, c, d, 1.0, 0.0) - b).abs() < EPS);
        assert!((bilinear(a, b, c, d, 0.0, 1.0) - c).abs() < EPS);
        assert!((bilinear(a, b, c, d, 1.0, 1.0) - d).abs() < EPS);
        assert!((bilinear(a, b, c, d, 0.5, 0.5) - 5.0).abs() < EPS);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let (a, b, c, d) = (0.3, 2.1, -0.7, 4.2);
        let (u, v) = (0.37, 0.81);
        let h = 1e-6;
        let (du, dv) = bilinear_gradient(a, b, c, d, u, v);
        let fd_u = (bilinear(a, b, c, d, u + h, v) - bilinear(a, b, c, d, u - h, v)) / (2.0 * h);
        let fd_v = (bilinear(a, b, c, d, u, v + h) - bilinear(a, b, c, d, u, v - h)) / (2.0 * h);
        assert!((du - fd_u).abs() < 1e-6);
        assert!((dv - fd_v).abs() < 1e-6);
    }

    #[test]
    fn planar_agrees_with_bilinear_on_affine_corners() {
        // corners of the affine field 2u + 3v + 1
        let (a, b, c, d) = (1.0, 3.0, 4.0, 6.0);
        for &(u, v) in &[(0.2, 0.4), (-1.5, 0.3), (2.5, 3.0)] {
            assert!((planar(a, b, c, d, u, v) - bilinear(a, b, c, d, u, v)).abs() < 1e-9);
        }
    }

    #[test]
    fn outside_distance_regions() {
        assert_eq!(outside_distance(0.5, 0.5), 0.0);
        assert!((outside_distance(1.25, 0.5) - 0.25).abs() < EPS);
        assert!((outside_distance(0.5, -0.75) - 0.75).abs() < EPS);
        assert!((outside_distance(-0.3, -0.4) - 0.5).abs() < EPS);
        assert!((outside_distance(4.0, 5.0) - 5.0).abs() < EPS);
        assert_eq!(blend_factor(4.0, 5.0), 1.0);
        assert!((blend_factor(1.5, 0.0) - 0.5).abs() < EPS);
    }

    #[test]
    fn neighbor_weight_favours_self() {
        assert!((neighbor_weight(0, 0) - SQRT_2).abs() < EPS);
        assert!((neighbor_weight(1, 0) - 1.0).abs() < EPS);
        assert!((neighbor_weight(3, 4) - 0.2).abs() < EPS);
        assert!(neighbor_weight(0, 0) > neighbor_weight(0, 1));
    }
}
