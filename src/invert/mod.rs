//! Inversion of a forward deformation map.
//!
//! [`InversionIndex`] is built once per map and answers "which grid position
//! of the map lands on this target point?". Valid quads are registered in a
//! uniform bucket grid over target space sized to the typical quad extent;
//! a query enumerates only the quads of one bucket, tests their padded
//! bounding boxes and solves the bilinear inverse for each candidate.
//!
//! A failed query is a normal outcome (the point is outside the mapped
//! domain) and is reported as `None`. The index borrows the map and never
//! mutates after construction, so it can be shared across threads.

mod buckets;
mod resample;
mod solve;

pub use resample::{invert_map, invert_map_with_diagnostics};

use crate::diagnostics::IndexStats;
use crate::error::MapError;
use crate::map::{DeformationMap, Quad};
use crate::types::Bounds;
use buckets::BucketGrid;
use log::{debug, warn};
use serde::Deserialize;

/// Tolerances of the inversion query.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct InvertOptions {
    /// Band around the unit square (local units) and around each quad's
    /// bounding box (target units) that still counts as inside.
    pub edge_epsilon: f64,
    /// Accepted Newton residual, relative to the quad extent.
    pub residual_tolerance: f64,
    /// Newton iteration cap per candidate quad.
    pub max_iterations: usize,
}

impl Default for InvertOptions {
    fn default() -> Self {
        Self {
            edge_epsilon: 1e-3,
            residual_tolerance: 1e-5,
            max_iterations: 24,
        }
    }
}

struct IndexedQuad {
    quad: Quad,
    bounds: Bounds,
}

/// Point-location structure over the valid quads of one map.
pub struct InversionIndex<'a> {
    map: &'a DeformationMap,
    quads: Vec<IndexedQuad>,
    grid: BucketGrid,
    options: InvertOptions,
}

impl<'a> InversionIndex<'a> {
    /// Index `map` with default tolerances.
    pub fn new(map: &'a DeformationMap) -> Result<Self, MapError> {
        Self::with_options(map, InvertOptions::default())
    }

    /// Index every valid quad of `map`.
    ///
    /// A valid quad with a non-finite corner coordinate means the map is
    /// corrupt and fails the build.
    pub fn with_options(map: &'a DeformationMap, options: InvertOptions) -> Result<Self, MapError> {
        let eps = options.edge_epsilon.max(0.0);
        let mut quads = Vec::new();
        let mut extent = Bounds::empty();
        let mut extent_sum = 0.0;
        for quad in map.valid_quads() {
            if !quad.is_finite() {
                return Err(MapError::NonFinite {
                    x: quad.ix,
                    y: quad.iy,
                });
            }
            let bounds = quad.bounds().expanded(eps);
            extent.include(bounds.min_x, bounds.min_y);
            extent.include(bounds.max_x, bounds.max_y);
            extent_sum += bounds.width().max(bounds.height());
            quads.push(IndexedQuad { quad, bounds });
        }

        if quads.is_empty() {
            warn!(
                "InversionIndex: map {}x{} has no valid quads; every query will miss",
                map.width(),
                map.height()
            );
        }

        let cell_hint = if quads.is_empty() {
            1.0
        } else {
            extent_sum / quads.len() as f64
        };
        let mut grid = BucketGrid::new(extent, cell_hint, quads.len());
        for (id, q) in quads.iter().enumerate() {
            grid.insert(id as u32, &q.bounds);
        }
        debug!(
            "InversionIndex: {} quads, {} buckets (cell={:.3}, max_bucket={})",
            quads.len(),
            grid.bucket_count(),
            grid.cell_size(),
            grid.max_bucket_len()
        );

        Ok(Self {
            map,
            quads,
            grid,
            options,
        })
    }

    /// The map this index was built over.
    pub fn map(&self) -> &'a DeformationMap {
        self.map
    }

    pub fn options(&self) -> &InvertOptions {
        &self.options
    }

    /// Continuous grid coordinates `(ix + u, iy + v)` of the map position
    /// that lands on target point `(x, y)`, or `None` when no valid quad
    /// covers it.
    ///
    /// Candidates are tried in bucket order and the first admissible
    /// solution wins.
    pub fn invert(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let eps = self.options.edge_epsilon;
        for &id in self.grid.candidates(x, y) {
            let entry = &self.quads[id as usize];
            if !entry.bounds.contains(x, y) {
                continue;
            }
            let Some((u, v)) = solve::solve_local(
                &entry.quad,
                x,
                y,
                self.options.residual_tolerance,
                self.options.max_iterations,
            ) else {
                continue;
            };
            if u < -eps || u > 1.0 + eps || v < -eps || v > 1.0 + eps {
                continue;
            }
            return Some([entry.quad.ix as f64 + u, entry.quad.iy as f64 + v]);
        }
        None
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            quads: self.quads.len(),
            buckets: self.grid.bucket_count(),
            cell_size: self.grid.cell_size(),
            max_bucket_len: self.grid.max_bucket_len(),
        }
    }
}
