//! Deformation map: a row-major grid of mapped points with confidence.
//!
//! A map at level `L` has one node per `2^L` source units. Node `(x, y)`
//! sits at global grid position `(x + origin_x, y + origin_y)` and stores
//! where that position lands in target space, again in cells of size `2^L`.
//! Maps are validated on construction and immutable afterwards; derived maps
//! are produced by consuming builders such as [`DeformationMap::with_confidence_clamp`].

mod quad;

pub use quad::Quad;

use crate::error::MapError;
use crate::numeric::level_scale;
use crate::types::{Bounds, MapNode, QuadSample};
use serde::{Deserialize, Serialize};

/// Largest level whose scale factor still fits the integer arithmetic of the
/// interchange format.
pub const MAX_LEVEL: u32 = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MapRecord", rename_all = "camelCase")]
pub struct DeformationMap {
    level: u32,
    width: usize,
    height: usize,
    origin_x: i32,
    origin_y: i32,
    source_label: String,
    target_label: String,
    nodes: Vec<MapNode>,
}

/// Unvalidated interchange record; converted through [`DeformationMap::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapRecord {
    level: u32,
    width: usize,
    height: usize,
    #[serde(default)]
    origin_x: i32,
    #[serde(default)]
    origin_y: i32,
    #[serde(default)]
    source_label: String,
    #[serde(default)]
    target_label: String,
    nodes: Vec<MapNode>,
}

impl TryFrom<MapRecord> for DeformationMap {
    type Error = MapError;

    fn try_from(r: MapRecord) -> Result<Self, Self::Error> {
        Ok(
            DeformationMap::new(r.level, r.width, r.height, (r.origin_x, r.origin_y), r.nodes)?
                .with_labels(r.source_label, r.target_label),
        )
    }
}

impl DeformationMap {
    /// Build a map from row-major nodes (`y` outer loop).
    ///
    /// Fails on a node count that does not match `width * height`, on a level
    /// above [`MAX_LEVEL`], and on any negative or NaN confidence.
    pub fn new(
        level: u32,
        width: usize,
        height: usize,
        origin: (i32, i32),
        nodes: Vec<MapNode>,
    ) -> Result<Self, MapError> {
        if level > MAX_LEVEL {
            return Err(MapError::InvalidLevel { level });
        }
        let expected = width * height;
        if nodes.len() != expected {
            return Err(MapError::ShapeMismatch {
                expected,
                found: nodes.len(),
            });
        }
        for (i, n) in nodes.iter().enumerate() {
            if n.c.is_nan() || n.c < 0.0 {
                return Err(MapError::InvalidConfidence {
                    x: i % width,
                    y: i / width,
                    value: n.c,
                });
            }
        }
        Ok(Self {
            level,
            width,
            height,
            origin_x: origin.0,
            origin_y: origin.1,
            source_label: String::new(),
            target_label: String::new(),
            nodes,
        })
    }

    /// Map whose node `(i, j)` lands on global grid position
    /// `(i + origin_x, j + origin_y)` with full confidence.
    pub fn identity(
        level: u32,
        width: usize,
        height: usize,
        origin_x: i32,
        origin_y: i32,
    ) -> Result<Self, MapError> {
        let mut nodes = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                nodes.push(MapNode::new(
                    (x as i64 + origin_x as i64) as f32,
                    (y as i64 + origin_y as i64) as f32,
                    1.0,
                ));
            }
        }
        Self::new(level, width, height, (origin_x, origin_y), nodes)
    }

    /// Attach provenance labels.
    pub fn with_labels(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_label = source.into();
        self.target_label = target.into();
        self
    }

    /// Binarize confidences: `>= threshold` becomes 1, everything else 0.
    ///
    /// A zero threshold leaves the map untouched.
    pub fn with_confidence_clamp(mut self, threshold: f32) -> Self {
        binarize_confidence(&mut self.nodes, threshold);
        self
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    /// Source units per grid cell (`2^level`).
    pub fn scale_factor(&self) -> f64 {
        level_scale(self.level)
    }

    pub fn nodes(&self) -> &[MapNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<MapNode> {
        self.nodes
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Node at `(x, y)`. Panics when out of range.
    #[inline]
    pub fn node(&self, x: usize, y: usize) -> MapNode {
        assert!(x < self.width && y < self.height, "node ({x},{y}) out of range");
        self.nodes[self.idx(x, y)]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<MapNode> {
        (x < self.width && y < self.height).then(|| self.nodes[self.idx(x, y)])
    }

    /// Quad with lower-left node `(ix, iy)`, if it lies inside the grid.
    pub fn quad(&self, ix: usize, iy: usize) -> Option<Quad> {
        if ix + 1 >= self.width || iy + 1 >= self.height {
            return None;
        }
        Some(Quad {
            ix,
            iy,
            n00: self.nodes[self.idx(ix, iy)],
            n10: self.nodes[self.idx(ix + 1, iy)],
            n01: self.nodes[self.idx(ix, iy + 1)],
            n11: self.nodes[self.idx(ix + 1, iy + 1)],
        })
    }

    /// Bilinear evaluation of quad `(ix, iy)` at local `(u, v)`.
    ///
    /// Returns `None` for a quad outside the grid. A sample with
    /// `c_min == 0` comes from an invalid quad and its coordinates are
    /// undefined.
    pub fn evaluate_quad(&self, ix: usize, iy: usize, u: f64, v: f64) -> Option<QuadSample> {
        self.quad(ix, iy).map(|q| q.evaluate(u, v))
    }

    /// All quads in row-major order.
    pub fn quads(&self) -> impl Iterator<Item = Quad> + '_ {
        let qw = self.width.saturating_sub(1);
        let qh = self.height.saturating_sub(1);
        (0..qh).flat_map(move |iy| (0..qw).filter_map(move |ix| self.quad(ix, iy)))
    }

    pub fn valid_quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.quads().filter(Quad::is_valid)
    }

    pub fn valid_quad_count(&self) -> usize {
        self.valid_quads().count()
    }

    /// Target-space bounding box of all nodes with nonzero confidence.
    pub fn valid_bounds(&self) -> Option<Bounds> {
        let mut b = Bounds::empty();
        for n in self.nodes.iter().filter(|n| n.is_valid()) {
            b.include(n.x as f64, n.y as f64);
        }
        (!b.is_empty()).then_some(b)
    }
}

pub(crate) fn binarize_confidence(nodes: &mut [MapNode], threshold: f32) {
    if threshold == 0.0 {
        return;
    }
    for n in nodes.iter_mut() {
        n.c = if n.c >= threshold { 1.0 } else { 0.0 };
    }
}
