use super::{InversionIndex, InvertOptions};
use crate::diagnostics::{InvertReport, TimingBreakdown};
use crate::error::MapError;
use crate::map::{DeformationMap, MAX_LEVEL};
use crate::numeric::level_scale;
use crate::types::MapNode;
use log::debug;
use std::time::Instant;

/// Resample the inverse of `map` onto a regular grid over its target extent.
///
/// The output grid covers the bounding box of all valid nodes at
/// `output_level` (default: the input level). Every output node that lands
/// on a valid quad of `map` stores the corresponding input grid position;
/// afterwards only nodes that belong to at least one fully inverted quad
/// keep confidence 1.
pub fn invert_map(
    map: &DeformationMap,
    output_level: Option<u32>,
    options: InvertOptions,
) -> Result<DeformationMap, MapError> {
    invert_map_with_diagnostics(map, output_level, options).map(|(out, _)| out)
}

pub fn invert_map_with_diagnostics(
    map: &DeformationMap,
    output_level: Option<u32>,
    options: InvertOptions,
) -> Result<(DeformationMap, InvertReport), MapError> {
    let start = Instant::now();
    let bounds = map.valid_bounds().ok_or(MapError::NoValidNodes)?;
    if bounds.min_x >= bounds.max_x || bounds.min_y >= bounds.max_y {
        return Err(MapError::NoValidNodes);
    }
    let o_level = output_level.unwrap_or(map.level());
    if o_level > MAX_LEVEL {
        return Err(MapError::InvalidLevel { level: o_level });
    }
    let scale = map.scale_factor();
    let o_scale = level_scale(o_level);

    let (ox_min, ow) = output_span(bounds.min_x * scale / o_scale, bounds.max_x * scale / o_scale)?;
    let (oy_min, oh) = output_span(bounds.min_y * scale / o_scale, bounds.max_y * scale / o_scale)?;
    let max_nodes = isize::MAX as usize / std::mem::size_of::<MapNode>();
    if ow.checked_mul(oh).map_or(true, |n| n > max_nodes) {
        return Err(MapError::InvalidArguments(format!(
            "inverse grid {ow}x{oh} is too large to allocate"
        )));
    }

    let mut timing = TimingBreakdown::default();
    let index = timing.time("index", || InversionIndex::with_options(map, options))?;

    let invert_start = Instant::now();
    let mut nodes = vec![MapNode::INVALID; ow * oh];
    let mut inverted = 0usize;
    for y in 0..oh {
        for x in 0..ow {
            let xv = (x as i64 + ox_min as i64) as f64 * o_scale / scale;
            let yv = (y as i64 + oy_min as i64) as f64 * o_scale / scale;
            if let Some(p) = index.invert(xv, yv) {
                nodes[y * ow + x] = MapNode::new(
                    (p[0] * scale / o_scale) as f32,
                    (p[1] * scale / o_scale) as f32,
                    1.0,
                );
                inverted += 1;
            }
        }
    }
    timing.push("invert", invert_start.elapsed().as_secs_f64() * 1000.0);

    let valid_nodes = retain_quad_corners(&mut nodes, ow, oh);
    timing.total_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(
        "invert_map: {}x{} -> {}x{} at level {} ({} inverted, {} kept)",
        map.width(),
        map.height(),
        ow,
        oh,
        o_level,
        inverted,
        valid_nodes
    );

    let report = InvertReport {
        width: ow,
        height: oh,
        level: o_level,
        origin: (ox_min, oy_min),
        inverted,
        valid_nodes,
        index: index.stats(),
        timing,
    };
    let out = DeformationMap::new(o_level, ow, oh, (ox_min, oy_min), nodes)?
        .with_labels(map.target_label(), map.source_label());
    Ok((out, report))
}

/// First output node and node count covering `[min, max]` in output cells.
fn output_span(min: f64, max: f64) -> Result<(i32, usize), MapError> {
    let lo = min.floor();
    let hi = max.ceil();
    let range = i32::MIN as f64..=i32::MAX as f64;
    if !range.contains(&lo) || !range.contains(&hi) {
        return Err(MapError::InvalidArguments(format!(
            "inverse extent [{min}, {max}] exceeds the grid index range"
        )));
    }
    let (lo, hi) = (lo as i32, hi as i32);
    let count = hi
        .checked_sub(lo)
        .and_then(|d| d.checked_add(1))
        .ok_or_else(|| {
            MapError::InvalidArguments(format!("inverse extent [{lo}, {hi}] is too wide"))
        })?;
    Ok((lo, count as usize))
}

/// Keep confidence 1 only on nodes that are a corner of a quad with four
/// mapped corners. Returns the number of nodes kept.
fn retain_quad_corners(nodes: &mut [MapNode], w: usize, h: usize) -> usize {
    let mut quad_ok = vec![false; w * h];
    for y in 0..h.saturating_sub(1) {
        for x in 0..w.saturating_sub(1) {
            quad_ok[y * w + x] = nodes[y * w + x].is_valid()
                && nodes[y * w + x + 1].is_valid()
                && nodes[(y + 1) * w + x].is_valid()
                && nodes[(y + 1) * w + x + 1].is_valid();
        }
    }
    let mut kept = 0;
    for y in 0..h {
        for x in 0..w {
            let touches = quad_ok[y * w + x]
                || (x > 0 && quad_ok[y * w + x - 1])
                || (y > 0 && quad_ok[(y - 1) * w + x])
                || (x > 0 && y > 0 && quad_ok[(y - 1) * w + x - 1]);
            let n = &mut nodes[y * w + x];
            if touches {
                n.c = 1.0;
                kept += 1;
            } else {
                n.c = 0.0;
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_of_shift_is_negative_shift() {
        // node (i, j) -> (i + 2, j + 3)
        let mut nodes = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                nodes.push(MapNode::new(x as f32 + 2.0, y as f32 + 3.0, 1.0));
            }
        }
        let map = DeformationMap::new(0, 4, 4, (0, 0), nodes)
            .unwrap()
            .with_labels("tile", "mosaic");
        let inv = invert_map(&map, None, InvertOptions::default()).unwrap();
        assert_eq!(inv.origin(), (2, 3));
        assert_eq!((inv.width(), inv.height()), (4, 4));
        assert_eq!(inv.source_label(), "mosaic");
        for y in 0..4 {
            for x in 0..4 {
                let n = inv.node(x, y);
                assert_eq!(n.c, 1.0);
                assert!((n.x - x as f32).abs() < 1e-4);
                assert!((n.y - y as f32).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn coarser_output_level_rescales() {
        let map = DeformationMap::identity(0, 5, 5, 0, 0).unwrap();
        let inv = invert_map(&map, Some(1), InvertOptions::default()).unwrap();
        assert_eq!(inv.level(), 1);
        assert_eq!((inv.width(), inv.height()), (3, 3));
        let n = inv.node(2, 1);
        assert!((n.x - 2.0).abs() < 1e-4 && (n.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn isolated_hits_are_cleared() {
        let mut grid = vec![MapNode::new(1.0, 1.0, 1.0); 9];
        grid[0] = MapNode::INVALID;
        grid[6].c = 0.0;
        grid[8].c = 0.0;
        let kept = retain_quad_corners(&mut grid, 3, 3);
        // only quad (1,0) has four mapped corners
        assert_eq!(kept, 4);
        assert_eq!(grid[1].c, 1.0);
        assert_eq!(grid[3].c, 0.0);
        assert_eq!(grid[7].c, 0.0);
    }

    #[test]
    fn extent_beyond_index_range_is_rejected() {
        let wide = DeformationMap::new(
            0,
            2,
            1,
            (0, 0),
            vec![MapNode::new(-2.0e9, 0.0, 1.0), MapNode::new(2.0e9, 1.0, 1.0)],
        )
        .unwrap();
        assert!(matches!(
            invert_map(&wide, None, InvertOptions::default()),
            Err(MapError::InvalidArguments(_))
        ));

        let far = DeformationMap::new(
            0,
            2,
            1,
            (0, 0),
            vec![MapNode::new(0.0, 0.0, 1.0), MapNode::new(1e30, 1.0, 1.0)],
        )
        .unwrap();
        assert!(matches!(
            invert_map(&far, None, InvertOptions::default()),
            Err(MapError::InvalidArguments(_))
        ));
    }

    #[test]
    fn output_span_is_inclusive() {
        assert_eq!(output_span(-1.5, 2.2).unwrap(), (-2, 6));
        assert_eq!(output_span(3.0, 4.0).unwrap(), (3, 2));
        assert!(output_span(-2.0e9, 2.0e9).is_err());
    }

    #[test]
    fn empty_map_has_no_inverse() {
        let map = DeformationMap::new(0, 2, 2, (0, 0), vec![MapNode::INVALID; 4]).unwrap();
        assert_eq!(
            invert_map(&map, None, InvertOptions::default()).unwrap_err(),
            MapError::NoValidNodes
        );
    }
}
