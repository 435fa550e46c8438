//! Composition of two deformation maps.
//!
//! `map1` is walked node by node. Each node's target coordinate is rescaled
//! into `map2` units and resolved against `map2`:
//!
//! - [`ComposeMode::Forward`] samples `map2`'s field there (`map2 ∘ map1`),
//!   falling back to the [`Extrapolator`] outside `map2`'s valid domain when
//!   an extrapolation distance is configured.
//! - [`ComposeMode::Inverse`] looks the point up in an [`InversionIndex`]
//!   over `map2` (`map2⁻¹ ∘ map1`).
//!
//! The output has `map1`'s level, shape and origin. Unmapped inputs and
//! failed lookups yield unmapped nodes; NaN geometry aborts the pass.
//! The optional confidence clamp runs as a separate final pass.

mod extrapolate;
mod node;

pub use extrapolate::{Extrapolation, Extrapolator};

use crate::diagnostics::{ComposeCounts, ComposeReport, TimingBreakdown};
use crate::error::MapError;
use crate::invert::{InversionIndex, InvertOptions};
use crate::map::{binarize_confidence, DeformationMap};
use crate::types::MapNode;
use log::{debug, warn};
use node::{Lookup, NodeComposer};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeMode {
    /// `map2 ∘ map1`
    #[default]
    Forward,
    /// `map2⁻¹ ∘ map1`
    Inverse,
}

/// Parameters of one composition pass.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComposeParams {
    pub mode: ComposeMode,
    /// Maximum extrapolation distance in level-0 (physical) units; 0 disables
    /// extrapolation. Only valid in forward mode.
    pub extrapolation_distance: f32,
    /// Nonzero: binarize output confidence (`>= clamp` → 1, else 0).
    /// Also the threshold below which quads are ignored by extrapolation.
    pub confidence_clamp: f32,
    /// Nonzero `map1` confidences below this value are raised to it.
    pub confidence_floor: f32,
    /// Band (cells) beyond `map2`'s outer nodes still treated as inside.
    pub edge_tolerance: f64,
    /// Inversion tolerances for inverse mode.
    pub invert: InvertOptions,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            mode: ComposeMode::Forward,
            extrapolation_distance: 0.0,
            confidence_clamp: 0.0,
            confidence_floor: 1e-3,
            edge_tolerance: 1e-3,
            invert: InvertOptions::default(),
        }
    }
}

impl ComposeParams {
    pub fn new(mode: ComposeMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_extrapolation(mut self, distance: f32) -> Self {
        self.extrapolation_distance = distance;
        self
    }

    pub fn with_confidence_clamp(mut self, threshold: f32) -> Self {
        self.confidence_clamp = threshold;
        self
    }

    /// Reject parameter combinations that have no defined behaviour.
    pub fn validate(&self) -> Result<(), MapError> {
        if !self.extrapolation_distance.is_finite() || self.extrapolation_distance < 0.0 {
            return Err(MapError::InvalidArguments(format!(
                "extrapolation distance must be finite and >= 0 (got {})",
                self.extrapolation_distance
            )));
        }
        if self.mode == ComposeMode::Inverse && self.extrapolation_distance != 0.0 {
            return Err(MapError::InvalidArguments(
                "extrapolation cannot be used with inverse composition".to_string(),
            ));
        }
        if !self.confidence_clamp.is_finite() || self.confidence_clamp < 0.0 {
            return Err(MapError::InvalidArguments(format!(
                "confidence clamp must be finite and >= 0 (got {})",
                self.confidence_clamp
            )));
        }
        if !self.confidence_floor.is_finite() || self.confidence_floor < 0.0 {
            return Err(MapError::InvalidArguments(format!(
                "confidence floor must be finite and >= 0 (got {})",
                self.confidence_floor
            )));
        }
        Ok(())
    }
}

/// Chains two deformation maps according to [`ComposeParams`].
#[derive(Clone, Debug, Default)]
pub struct Compositor {
    params: ComposeParams,
}

impl Compositor {
    pub fn new(params: ComposeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ComposeParams {
        &self.params
    }

    pub fn compose(
        &self,
        map1: &DeformationMap,
        map2: &DeformationMap,
    ) -> Result<DeformationMap, MapError> {
        self.compose_with_diagnostics(map1, map2).map(|(out, _)| out)
    }

    pub fn compose_with_diagnostics(
        &self,
        map1: &DeformationMap,
        map2: &DeformationMap,
    ) -> Result<(DeformationMap, ComposeReport), MapError> {
        let params = &self.params;
        params.validate()?;
        let start = Instant::now();
        let mut timing = TimingBreakdown::default();

        let scale1 = map1.scale_factor();
        let scale2 = map2.scale_factor();
        let to_map2 = scale1 / scale2;

        let (lookup, index_stats) = match params.mode {
            ComposeMode::Forward => {
                let extrapolator = (params.extrapolation_distance > 0.0).then(|| {
                    Extrapolator::new(
                        map2,
                        params.extrapolation_distance as f64 / scale2,
                        params.confidence_clamp,
                    )
                });
                (Lookup::Forward { map2, extrapolator }, None)
            }
            ComposeMode::Inverse => {
                let index =
                    timing.time("index", || InversionIndex::with_options(map2, params.invert))?;
                let stats = index.stats();
                (Lookup::Inverse { index }, Some(stats))
            }
        };
        let composer = NodeComposer {
            lookup,
            to_map2,
            confidence_floor: params.confidence_floor,
            edge_tolerance: params.edge_tolerance,
        };

        let (mut nodes, counts) = timing.time("compose", || compose_rows(&composer, map1))?;

        if params.confidence_clamp != 0.0 {
            timing.time("clamp", || binarize_confidence(&mut nodes, params.confidence_clamp));
        }
        let valid_nodes = nodes.iter().filter(|n| n.is_valid()).count();
        timing.total_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "Compositor::compose {:?} {}x{} (level {}) with {}x{} (level {}): {} direct, {} extrapolated, {} inverted, {} missed, {} skipped",
            params.mode,
            map1.width(),
            map1.height(),
            map1.level(),
            map2.width(),
            map2.height(),
            map2.level(),
            counts.direct,
            counts.extrapolated,
            counts.inverted,
            counts.missed,
            counts.skipped
        );
        if counts.missed > 0 && counts.direct + counts.extrapolated + counts.inverted == 0 {
            warn!(
                "Compositor::compose: none of the {} mapped input nodes landed on map2",
                counts.missed
            );
        }

        let target_label = match params.mode {
            ComposeMode::Forward => map2.target_label(),
            ComposeMode::Inverse => map2.source_label(),
        };
        let out = DeformationMap::new(map1.level(), map1.width(), map1.height(), map1.origin(), nodes)?
            .with_labels(map1.source_label(), target_label);
        let report = ComposeReport {
            mode: params.mode,
            width: map1.width(),
            height: map1.height(),
            counts,
            valid_nodes,
            index: index_stats,
            timing,
        };
        Ok((out, report))
    }
}

/// Compose `map1` with `map2` in `mode`.
///
/// `extrapolation_distance` is in level-0 units (0 disables extrapolation);
/// a nonzero `confidence_clamp` binarizes the output confidences.
pub fn compose(
    map1: &DeformationMap,
    map2: &DeformationMap,
    mode: ComposeMode,
    extrapolation_distance: f32,
    confidence_clamp: f32,
) -> Result<DeformationMap, MapError> {
    let params = ComposeParams::new(mode)
        .with_extrapolation(extrapolation_distance)
        .with_confidence_clamp(confidence_clamp);
    Compositor::new(params).compose(map1, map2)
}

#[cfg(not(feature = "parallel"))]
fn compose_rows(
    composer: &NodeComposer<'_>,
    map1: &DeformationMap,
) -> Result<(Vec<MapNode>, ComposeCounts), MapError> {
    compose_rows_sequential(composer, map1)
}

#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn compose_rows_sequential(
    composer: &NodeComposer<'_>,
    map1: &DeformationMap,
) -> Result<(Vec<MapNode>, ComposeCounts), MapError> {
    let mut nodes = Vec::with_capacity(map1.width() * map1.height());
    let mut counts = ComposeCounts::default();
    for y in 0..map1.height() {
        let (row, row_counts) = composer.compose_row(map1, y)?;
        nodes.extend(row);
        counts.merge(&row_counts);
    }
    Ok((nodes, counts))
}

#[cfg(feature = "parallel")]
fn compose_rows(
    composer: &NodeComposer<'_>,
    map1: &DeformationMap,
) -> Result<(Vec<MapNode>, ComposeCounts), MapError> {
    use rayon::prelude::*;

    let rows: Vec<Result<(Vec<MapNode>, ComposeCounts), MapError>> = (0..map1.height())
        .into_par_iter()
        .map(|y| composer.compose_row(map1, y))
        .collect();

    let mut nodes = Vec::with_capacity(map1.width() * map1.height());
    let mut counts = ComposeCounts::default();
    for row in rows {
        let (row, row_counts) = row?;
        nodes.extend(row);
        counts.merge(&row_counts);
    }
    Ok((nodes, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_map() -> DeformationMap {
        DeformationMap::new(
            0,
            2,
            2,
            (0, 0),
            vec![
                MapNode::new(0.0, 0.0, 1.0),
                MapNode::new(10.0, 0.0, 1.0),
                MapNode::new(0.0, 10.0, 1.0),
                MapNode::new(10.0, 10.0, 1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn inverse_with_extrapolation_is_rejected() {
        let map = square_map();
        let err = compose(&map, &map, ComposeMode::Inverse, 4.0, 0.0).unwrap_err();
        assert!(matches!(err, MapError::InvalidArguments(_)));
    }

    #[test]
    fn negative_extrapolation_is_rejected() {
        let params = ComposeParams::new(ComposeMode::Forward).with_extrapolation(-1.0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn tiny_confidence_is_raised_to_floor() {
        let mut nodes = square_map().into_nodes();
        nodes[0] = MapNode::new(2.0, 2.0, 1e-5);
        let map1 = DeformationMap::new(0, 2, 2, (0, 0), nodes).unwrap();
        let map2 = DeformationMap::identity(0, 12, 12, 0, 0).unwrap();
        let out = compose(&map1, &map2, ComposeMode::Forward, 0.0, 0.0).unwrap();
        assert!((out.node(0, 0).c - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn forward_labels_follow_the_chain() {
        let map1 = square_map().with_labels("tile", "section");
        let map2 = DeformationMap::identity(0, 12, 12, 0, 0)
            .unwrap()
            .with_labels("section", "mosaic");
        let out = compose(&map1, &map2, ComposeMode::Forward, 0.0, 0.0).unwrap();
        assert_eq!(out.source_label(), "tile");
        assert_eq!(out.target_label(), "mosaic");
        let inv = compose(&map1, &map2, ComposeMode::Inverse, 0.0, 0.0).unwrap();
        assert_eq!(inv.target_label(), "section");
    }

    #[test]
    fn nan_input_coordinates_abort_forward_composition() {
        let mut nodes = square_map().into_nodes();
        nodes[1].x = f32::NAN;
        let map1 = DeformationMap::new(0, 2, 2, (0, 0), nodes).unwrap();
        let map2 = DeformationMap::identity(0, 12, 12, 0, 0).unwrap();
        let err = compose(&map1, &map2, ComposeMode::Forward, 0.0, 0.0).unwrap_err();
        assert_eq!(err, MapError::NonFinite { x: 1, y: 0 });
    }

    #[test]
    fn row_drivers_agree() {
        let mut nodes = Vec::new();
        for y in 0..9 {
            for x in 0..7 {
                let c = if (x + y) % 5 == 0 { 0.0 } else { 0.3 + 0.05 * x as f32 };
                nodes.push(MapNode::new(1.3 * x as f32 - 1.0, 0.9 * y as f32 + 0.4, c));
            }
        }
        let map1 = DeformationMap::new(0, 7, 9, (0, 0), nodes).unwrap();
        let map2 = DeformationMap::identity(1, 4, 4, 0, 0).unwrap();
        let composer = NodeComposer {
            lookup: Lookup::Forward {
                map2: &map2,
                extrapolator: Some(Extrapolator::new(&map2, 1.5, 0.0)),
            },
            to_map2: 0.5,
            confidence_floor: 1e-3,
            edge_tolerance: 1e-3,
        };
        let (seq_nodes, seq_counts) = compose_rows_sequential(&composer, &map1).unwrap();
        let (nodes, counts) = compose_rows(&composer, &map1).unwrap();
        assert_eq!(nodes, seq_nodes);
        assert_eq!(counts, seq_counts);
        assert!(counts.direct > 0 && counts.extrapolated > 0 && counts.skipped > 0);
        assert_eq!(counts.total(), 63);
    }

    #[test]
    fn report_counts_cover_every_node() {
        let mut nodes = square_map().into_nodes();
        nodes[3].c = 0.0;
        nodes[2] = MapNode::new(50.0, 50.0, 1.0);
        let map1 = DeformationMap::new(0, 2, 2, (0, 0), nodes).unwrap();
        let map2 = DeformationMap::identity(0, 12, 12, 0, 0).unwrap();
        let (_, report) = Compositor::new(ComposeParams::default())
            .compose_with_diagnostics(&map1, &map2)
            .unwrap();
        assert_eq!(report.counts.total(), 4);
        assert_eq!(report.counts.skipped, 1);
        assert_eq!(report.counts.missed, 1);
        assert_eq!(report.counts.direct, 2);
        assert_eq!(report.valid_nodes, 2);
    }
}
