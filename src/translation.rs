//! Best pure translation approximating a deformation map.
//!
//! Useful as a coarse starting point when a full nonlinear map is not
//! needed: the fit is the mean physical displacement over all mapped nodes.

use crate::error::MapError;
use crate::map::{DeformationMap, MAX_LEVEL};
use crate::numeric::level_scale;
use crate::types::MapNode;
use nalgebra::Vector2;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationFit {
    /// Mean displacement in level-0 units.
    pub tx: f64,
    pub ty: f64,
    /// Number of mapped nodes the mean was taken over.
    pub valid_nodes: usize,
}

/// Mean displacement `target - source` (level-0 units) over mapped nodes.
pub fn best_translation(map: &DeformationMap) -> Result<TranslationFit, MapError> {
    let scale = map.scale_factor();
    let (ox, oy) = map.origin();
    let mut sum = Vector2::<f64>::zeros();
    let mut n = 0usize;
    for y in 0..map.height() {
        for x in 0..map.width() {
            let node = map.node(x, y);
            if !node.is_valid() {
                continue;
            }
            let source = Vector2::new((x as i64 + ox as i64) as f64, (y as i64 + oy as i64) as f64);
            let target = Vector2::new(node.x as f64, node.y as f64);
            sum += (target - source) * scale;
            n += 1;
        }
    }
    if n == 0 {
        return Err(MapError::NoValidNodes);
    }
    let mean = sum / n as f64;
    Ok(TranslationFit {
        tx: mean.x,
        ty: mean.y,
        valid_nodes: n,
    })
}

impl TranslationFit {
    /// Smallest level whose single cell spans the physical extent of `map`.
    pub fn covering_level(map: &DeformationMap) -> u32 {
        let scale = map.scale_factor();
        let (ox, oy) = map.origin();
        let x_max = scale * (map.width() as f64 + ox as f64);
        let y_max = scale * (map.height() as f64 + oy as f64);
        let mut level = 0;
        while level < MAX_LEVEL && (x_max > level_scale(level) || y_max > level_scale(level)) {
            level += 1;
        }
        level
    }

    /// 2x2 map applying this translation over the extent of `map`, with the
    /// labels of `map`.
    pub fn to_map(&self, map: &DeformationMap) -> Result<DeformationMap, MapError> {
        let level = Self::covering_level(map);
        let f = level_scale(level);
        let node = |sx: f64, sy: f64| {
            MapNode::new(((self.tx + sx) / f) as f32, ((self.ty + sy) / f) as f32, 1.0)
        };
        let nodes = vec![node(0.0, 0.0), node(f, 0.0), node(0.0, f), node(f, f)];
        Ok(DeformationMap::new(level, 2, 2, (0, 0), nodes)?
            .with_labels(map.source_label(), map.target_label()))
    }
}
