use super::extrapolate::Extrapolator;
use crate::diagnostics::ComposeCounts;
use crate::error::MapError;
use crate::invert::InversionIndex;
use crate::map::DeformationMap;
use crate::types::MapNode;

/// How `map1` coordinates are resolved against `map2`.
pub(crate) enum Lookup<'a> {
    Forward {
        map2: &'a DeformationMap,
        extrapolator: Option<Extrapolator<'a>>,
    },
    Inverse {
        index: InversionIndex<'a>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Skipped,
    Direct,
    Extrapolated,
    Inverted,
    Missed,
}

/// Per-node composition kernel. Read-only, so rows can be processed
/// concurrently.
pub(crate) struct NodeComposer<'a> {
    pub(crate) lookup: Lookup<'a>,
    /// `2^level1 / 2^level2`: map1 cells to map2 cells.
    pub(crate) to_map2: f64,
    pub(crate) confidence_floor: f32,
    pub(crate) edge_tolerance: f64,
}

impl NodeComposer<'_> {
    /// Compose row `y` of `map1`.
    pub(crate) fn compose_row(
        &self,
        map1: &DeformationMap,
        y: usize,
    ) -> Result<(Vec<MapNode>, ComposeCounts), MapError> {
        let mut row = Vec::with_capacity(map1.width());
        let mut counts = ComposeCounts::default();
        for x in 0..map1.width() {
            let (node, outcome) = self.compose_node(map1.node(x, y), x, y)?;
            match outcome {
                Outcome::Skipped => counts.skipped += 1,
                Outcome::Direct => counts.direct += 1,
                Outcome::Extrapolated => counts.extrapolated += 1,
                Outcome::Inverted => counts.inverted += 1,
                Outcome::Missed => counts.missed += 1,
            }
            row.push(node);
        }
        Ok((row, counts))
    }

    /// Compose a single `map1` node found at grid position `(x, y)`.
    pub(crate) fn compose_node(
        &self,
        n1: MapNode,
        x: usize,
        y: usize,
    ) -> Result<(MapNode, Outcome), MapError> {
        if n1.c == 0.0 {
            return Ok((MapNode::INVALID, Outcome::Skipped));
        }
        if n1.c < 0.0 || n1.c.is_nan() {
            return Err(MapError::InvalidConfidence { x, y, value: n1.c });
        }
        let c1 = n1.c.max(self.confidence_floor);
        let xv = n1.x as f64 * self.to_map2;
        let yv = n1.y as f64 * self.to_map2;
        if !xv.is_finite() || !yv.is_finite() {
            return Err(MapError::NonFinite { x, y });
        }

        match &self.lookup {
            Lookup::Forward { map2, extrapolator } => {
                self.forward(map2, extrapolator.as_ref(), xv, yv, c1, x, y)
            }
            Lookup::Inverse { index } => match index.invert(xv, yv) {
                Some(p) => {
                    let node = self.to_map1(p[0], p[1], c1, x, y)?;
                    Ok((node, Outcome::Inverted))
                }
                None => Ok((MapNode::INVALID, Outcome::Missed)),
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn forward(
        &self,
        map2: &DeformationMap,
        extrapolator: Option<&Extrapolator<'_>>,
        xv: f64,
        yv: f64,
        c1: f32,
        x: usize,
        y: usize,
    ) -> Result<(MapNode, Outcome), MapError> {
        let (ox, oy) = map2.origin();
        let fx = xv.floor();
        let fy = yv.floor();
        let (Some(mut ix), Some(mut iy)) = (grid_index(fx, ox), grid_index(fy, oy)) else {
            return Ok((MapNode::INVALID, Outcome::Missed));
        };
        let mut u = xv - fx;
        let mut v = yv - fy;

        let w2 = map2.width() as i64;
        let h2 = map2.height() as i64;
        if outside_axis(ix, u, w2, self.edge_tolerance) || outside_axis(iy, v, h2, self.edge_tolerance) {
            return self.extrapolate_or_miss(extrapolator, ix, iy, u, v, x, y);
        }

        // pull nodes sitting on the outer boundary onto the last quad
        while ix < 0 {
            ix += 1;
            u -= 1.0;
        }
        while iy < 0 {
            iy += 1;
            v -= 1.0;
        }
        while ix >= w2 - 1 && ix > 0 {
            ix -= 1;
            u += 1.0;
        }
        while iy >= h2 - 1 && iy > 0 {
            iy -= 1;
            v += 1.0;
        }

        let Some(sample) = map2.evaluate_quad(ix as usize, iy as usize, u, v) else {
            return self.extrapolate_or_miss(extrapolator, ix, iy, u, v, x, y);
        };
        if !sample.is_valid() {
            return self.extrapolate_or_miss(extrapolator, ix, iy, u, v, x, y);
        }
        let node = self.to_map1(sample.x, sample.y, c1.min(sample.c_min), x, y)?;
        Ok((node, Outcome::Direct))
    }

    #[allow(clippy::too_many_arguments)]
    fn extrapolate_or_miss(
        &self,
        extrapolator: Option<&Extrapolator<'_>>,
        ix: i64,
        iy: i64,
        u: f64,
        v: f64,
        x: usize,
        y: usize,
    ) -> Result<(MapNode, Outcome), MapError> {
        match extrapolator.and_then(|e| e.extrapolate(ix, iy, u, v)) {
            Some(e) => {
                let node = self.to_map1(e.x, e.y, e.c, x, y)?;
                Ok((node, Outcome::Extrapolated))
            }
            None => Ok((MapNode::INVALID, Outcome::Missed)),
        }
    }

    /// Rescale a map2-unit coordinate back to map1 units.
    fn to_map1(&self, px: f64, py: f64, c: f32, x: usize, y: usize) -> Result<MapNode, MapError> {
        let ox = px / self.to_map2;
        let oy = py / self.to_map2;
        if !ox.is_finite() || !oy.is_finite() || !c.is_finite() {
            return Err(MapError::NonFinite { x, y });
        }
        Ok(MapNode::new(ox as f32, oy as f32, c))
    }
}

/// Grid index of floored coordinate `f` relative to `origin`, or `None` when
/// it does not fit in `i32` (far outside any representable map).
fn grid_index(f: f64, origin: i32) -> Option<i64> {
    let i = f - origin as f64;
    if i < i32::MIN as f64 || i > i32::MAX as f64 {
        return None;
    }
    Some(i as i64)
}

/// True when grid index `i` with fractional part `f` lies outside a grid of
/// `n` nodes, allowing a band of `tol` cells at the outer edges.
fn outside_axis(i: i64, f: f64, n: i64, tol: f64) -> bool {
    i < -1 || (i == -1 && f < 1.0 - tol) || (i == n - 1 && f > tol) || i >= n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_index_rejects_unrepresentable_offsets() {
        assert_eq!(grid_index(10.0, 3), Some(7));
        assert_eq!(grid_index(-5.0, -8), Some(3));
        assert_eq!(grid_index(-1e30, 3), None);
        assert_eq!(grid_index(1e30, 0), None);
        assert_eq!(grid_index(i32::MAX as f64, i32::MIN), None);
    }

    #[test]
    fn edge_band_accepts_near_boundary_points() {
        // 4 nodes along the axis: indices 0..=3
        assert!(!outside_axis(0, 0.5, 4, 1e-3));
        assert!(!outside_axis(3, 0.0005, 4, 1e-3));
        assert!(outside_axis(3, 0.01, 4, 1e-3));
        assert!(!outside_axis(-1, 0.9995, 4, 1e-3));
        assert!(outside_axis(-1, 0.99, 4, 1e-3));
        assert!(outside_axis(-2, 0.9999, 4, 1e-3));
        assert!(outside_axis(4, 0.0, 4, 1e-3));
    }
}
