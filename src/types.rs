use serde::{Deserialize, Serialize};

/// One grid node of a deformation map.
///
/// `x`, `y` are target-space coordinates in grid cells of the owning map's
/// level. A confidence of exactly `0.0` marks the node as unmapped regardless
/// of the coordinate contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub x: f32,
    pub y: f32,
    pub c: f32,
}

impl MapNode {
    /// The "no data" node.
    pub const INVALID: MapNode = MapNode {
        x: 0.0,
        y: 0.0,
        c: 0.0,
    };

    pub fn new(x: f32, y: f32, c: f32) -> Self {
        Self { x, y, c }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.c != 0.0
    }
}

/// Result of evaluating one quad at local coordinates `(u, v)`.
///
/// `c_min == 0` means the quad is invalid and `x`, `y` carry no meaning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadSample {
    pub x: f64,
    pub y: f64,
    pub c_min: f32,
}

impl QuadSample {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.c_min != 0.0
    }
}

/// Axis-aligned bounds in target space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// True when no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn expanded(&self, eps: f64) -> Self {
        Self {
            min_x: self.min_x - eps,
            min_y: self.min_y - eps,
            max_x: self.max_x + eps,
            max_y: self.max_y + eps,
        }
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
