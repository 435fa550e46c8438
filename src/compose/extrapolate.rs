use crate::map::DeformationMap;
use crate::numeric::{blend_factor, neighbor_weight, outside_distance};

/// Estimate of a mapped point outside the valid domain of a map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extrapolation {
    pub x: f64,
    pub y: f64,
    pub c: f32,
    /// Distance (grid cells) from the query to the nearest contributing quad.
    pub closest_distance: f64,
}

/// Inverse-distance blend of the valid quads around a query point.
///
/// Each quad within the search radius contributes a mix of its bilinear
/// (near-field) and planar (far-field) estimates; the mix moves to the
/// far-field estimate as the query leaves the quad, reaching it one cell
/// away.
#[derive(Clone, Copy, Debug)]
pub struct Extrapolator<'a> {
    map: &'a DeformationMap,
    max_distance: f64,
    confidence_threshold: f32,
}

impl<'a> Extrapolator<'a> {
    /// `max_distance` is in grid cells of `map`. Quads with any corner
    /// confidence at or below `confidence_threshold` are ignored.
    pub fn new(map: &'a DeformationMap, max_distance: f64, confidence_threshold: f32) -> Self {
        Self {
            map,
            max_distance,
            confidence_threshold,
        }
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Quads up to this many cells away (per axis) are considered.
    pub fn search_radius(&self) -> i64 {
        (self.max_distance.ceil() as i64).saturating_add(2)
    }

    /// Extrapolate at local offset `(u, v)` relative to quad `(ix, iy)`.
    ///
    /// `(ix, iy)` may lie outside the grid. Fails when no quad contributes or
    /// when the nearest contributing quad is farther than `max_distance`.
    pub fn extrapolate(&self, ix: i64, iy: i64, u: f64, v: f64) -> Option<Extrapolation> {
        let qw = self.map.width() as i64 - 1;
        let qh = self.map.height() as i64 - 1;
        let radius = self.search_radius();
        // search window clipped to the quads that exist
        let (qx_lo, qx_hi) = (ix.saturating_sub(radius).max(0), ix.saturating_add(radius).min(qw - 1));
        let (qy_lo, qy_hi) = (iy.saturating_sub(radius).max(0), iy.saturating_add(radius).min(qh - 1));

        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut sum_c = 0.0f64;
        let mut total_weight = 0.0f64;
        let mut closest = f64::MAX;

        for qy in qy_lo..=qy_hi {
            let dy = qy - iy;
            let rv = v - dy as f64;
            for qx in qx_lo..=qx_hi {
                let dx = qx - ix;
                let Some(quad) = self.map.quad(qx as usize, qy as usize) else {
                    continue;
                };
                if !quad.exceeds(self.confidence_threshold) {
                    continue;
                }
                let ru = u - dx as f64;
                let weight = neighbor_weight(dx, dy);

                let d = blend_factor(ru, rv);
                let (near_x, near_y) = if d < 1.0 {
                    let s = quad.evaluate(ru, rv);
                    (s.x, s.y)
                } else {
                    (0.0, 0.0)
                };
                let (far_x, far_y) = if d > 0.0 {
                    quad.far_field(ru, rv)
                } else {
                    (0.0, 0.0)
                };

                sum_x += weight * ((1.0 - d) * near_x + d * far_x);
                sum_y += weight * ((1.0 - d) * near_y + d * far_y);
                sum_c += weight * quad.min_confidence() as f64;
                total_weight += weight;
                closest = closest.min(outside_distance(ru, rv));
            }
        }

        if total_weight == 0.0 || closest > self.max_distance {
            return None;
        }
        Some(Extrapolation {
            x: sum_x / total_weight,
            y: sum_y / total_weight,
            c: (sum_c / total_weight) as f32,
            closest_distance: closest,
        })
    }
}
