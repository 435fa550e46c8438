use crate::map::Quad;
use nalgebra::{Matrix2, Vector2};

/// Cap on a single Newton update in local units.
const MAX_STEP: f64 = 2.0;
/// Iterates wandering this far from the unit square cannot become admissible.
const DIVERGED: f64 = 8.0;

/// Solve `quad.evaluate(u, v) == (tx, ty)` for local `(u, v)` by Newton
/// iteration from the quad centre.
///
/// `tolerance` is the accepted residual relative to the quad extent.
/// Returns `None` when the Jacobian is singular or the iteration does not
/// converge within `max_iterations`.
pub(crate) fn solve_local(
    quad: &Quad,
    tx: f64,
    ty: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Option<(f64, f64)> {
    let b = quad.bounds();
    let tol = tolerance * b.width().max(b.height()).max(1.0);
    let target = Vector2::new(tx, ty);
    let mut uv = Vector2::new(0.5, 0.5);

    for _ in 0..max_iterations {
        let s = quad.evaluate(uv.x, uv.y);
        let residual = Vector2::new(s.x, s.y) - target;
        if residual.norm() <= tol {
            return Some((uv.x, uv.y));
        }
        let j = quad.jacobian(uv.x, uv.y);
        let jac = Matrix2::new(j[0][0], j[0][1], j[1][0], j[1][1]);
        let inv = jac.try_inverse()?;
        let mut step = inv * residual;
        let norm = step.norm();
        if !norm.is_finite() {
            return None;
        }
        if norm > MAX_STEP {
            step *= MAX_STEP / norm;
        }
        uv -= step;
        if uv.x.abs() > DIVERGED || uv.y.abs() > DIVERGED {
            return None;
        }
    }

    let s = quad.evaluate(uv.x, uv.y);
    let residual = Vector2::new(s.x, s.y) - target;
    (residual.norm() <= tol).then_some((uv.x, uv.y))
}
