use crate::numeric::{bilinear, bilinear_gradient, min4, planar};
use crate::types::{Bounds, MapNode, QuadSample};

/// The four nodes bounding grid cell `(ix, iy)`.
///
/// Corner naming follows `n{dx}{dy}`: `n10` is the node at `(ix + 1, iy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub ix: usize,
    pub iy: usize,
    pub n00: MapNode,
    pub n10: MapNode,
    pub n01: MapNode,
    pub n11: MapNode,
}

impl Quad {
    /// A quad defines a mapping only when all four corners carry data.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min_confidence() != 0.0
    }

    #[inline]
    pub fn min_confidence(&self) -> f32 {
        min4(self.n00.c, self.n10.c, self.n01.c, self.n11.c)
    }

    /// True when every corner confidence is strictly above `threshold`.
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.n00.c > threshold
            && self.n10.c > threshold
            && self.n01.c > threshold
            && self.n11.c > threshold
    }

    pub fn xs(&self) -> [f64; 4] {
        [
            self.n00.x as f64,
            self.n10.x as f64,
            self.n01.x as f64,
            self.n11.x as f64,
        ]
    }

    pub fn ys(&self) -> [f64; 4] {
        [
            self.n00.y as f64,
            self.n10.y as f64,
            self.n01.y as f64,
            self.n11.y as f64,
        ]
    }

    /// Bilinear evaluation at local `(u, v)`; mild extrapolation is allowed.
    pub fn evaluate(&self, u: f64, v: f64) -> QuadSample {
        let [x00, x10, x01, x11] = self.xs();
        let [y00, y10, y01, y11] = self.ys();
        QuadSample {
            x: bilinear(x00, x10, x01, x11, u, v),
            y: bilinear(y00, y10, y01, y11, u, v),
            c_min: self.min_confidence(),
        }
    }

    /// Jacobian of [`Quad::evaluate`] as `[[dx/du, dx/dv], [dy/du, dy/dv]]`.
    pub fn jacobian(&self, u: f64, v: f64) -> [[f64; 2]; 2] {
        let [x00, x10, x01, x11] = self.xs();
        let [y00, y10, y01, y11] = self.ys();
        let (xu, xv) = bilinear_gradient(x00, x10, x01, x11, u, v);
        let (yu, yv) = bilinear_gradient(y00, y10, y01, y11, u, v);
        [[xu, xv], [yu, yv]]
    }

    /// Planar far-field estimate at local `(u, v)`.
    pub fn far_field(&self, u: f64, v: f64) -> (f64, f64) {
        let [x00, x10, x01, x11] = self.xs();
        let [y00, y10, y01, y11] = self.ys();
        (
            planar(x00, x10, x01, x11, u, v),
            planar(y00, y10, y01, y11, u, v),
        )
    }

    /// Target-space bounding box of the corners.
    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds::empty();
        for n in [self.n00, self.n10, self.n01, self.n11] {
            b.include(n.x as f64, n.y as f64);
        }
        b
    }

    /// True when all corner coordinates are finite.
    pub fn is_finite(&self) -> bool {
        [self.n00, self.n10, self.n01, self.n11]
            .iter()
            .all(|n| n.x.is_finite() && n.y.is_finite())
    }
}
