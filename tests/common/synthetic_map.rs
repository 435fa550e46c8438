use deform_map::{DeformationMap, MapNode};

/// Map whose node `(i, j)` lands on `f(i + origin_x, j + origin_y)`.
pub fn map_from_fn<F>(
    level: u32,
    width: usize,
    height: usize,
    origin: (i32, i32),
    c: f32,
    f: F,
) -> DeformationMap
where
    F: Fn(f64, f64) -> (f64, f64),
{
    let mut nodes = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let gx = (x as i64 + origin.0 as i64) as f64;
            let gy = (y as i64 + origin.1 as i64) as f64;
            let (tx, ty) = f(gx, gy);
            nodes.push(MapNode::new(tx as f32, ty as f32, c));
        }
    }
    DeformationMap::new(level, width, height, origin, nodes).unwrap()
}

/// Rotation + anisotropic scale + shift; injective.
pub fn affine(x: f64, y: f64) -> (f64, f64) {
    (1.2 * x + 0.1 * y + 3.0, -0.05 * x + 0.9 * y + 2.0)
}

/// Gentle nonlinear warp with Jacobian close to identity.
pub fn wavy(x: f64, y: f64) -> (f64, f64) {
    (
        x + 0.15 * (0.4 * y).sin() + 0.5,
        y + 0.15 * (0.3 * x).cos() + 0.25,
    )
}

pub fn with_confidence(map: &DeformationMap, c: f32) -> DeformationMap {
    let nodes = map
        .nodes()
        .iter()
        .map(|n| MapNode::new(n.x, n.y, c))
        .collect();
    DeformationMap::new(map.level(), map.width(), map.height(), map.origin(), nodes).unwrap()
}

/// Same map with the listed grid nodes unmapped.
pub fn with_holes(map: &DeformationMap, holes: &[(usize, usize)]) -> DeformationMap {
    let mut nodes = map.nodes().to_vec();
    for &(x, y) in holes {
        nodes[map.idx(x, y)] = MapNode::INVALID;
    }
    DeformationMap::new(map.level(), map.width(), map.height(), map.origin(), nodes).unwrap()
}
