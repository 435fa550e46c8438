use super::TimingBreakdown;
use crate::compose::ComposeMode;
use serde::Serialize;

/// Shape of an [`InversionIndex`](crate::invert::InversionIndex).
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub quads: usize,
    pub buckets: usize,
    pub cell_size: f64,
    pub max_bucket_len: usize,
}

/// How each output node of a composition was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeCounts {
    /// Nodes whose `map1` input was unmapped.
    pub skipped: usize,
    /// Forward lookups answered by a valid `map2` quad.
    pub direct: usize,
    /// Forward lookups answered by extrapolation.
    pub extrapolated: usize,
    /// Inverse lookups answered by the inversion index.
    pub inverted: usize,
    /// Lookups that produced an unmapped node.
    pub missed: usize,
}

impl ComposeCounts {
    pub fn total(&self) -> usize {
        self.skipped + self.direct + self.extrapolated + self.inverted + self.missed
    }

    pub(crate) fn merge(&mut self, other: &ComposeCounts) {
        self.skipped += other.skipped;
        self.direct += other.direct;
        self.extrapolated += other.extrapolated;
        self.inverted += other.inverted;
        self.missed += other.missed;
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeReport {
    pub mode: ComposeMode,
    pub width: usize,
    pub height: usize,
    pub counts: ComposeCounts,
    /// Nodes with nonzero confidence after the optional clamp.
    pub valid_nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexStats>,
    pub timing: TimingBreakdown,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvertReport {
    pub width: usize,
    pub height: usize,
    pub level: u32,
    pub origin: (i32, i32),
    pub inverted: usize,
    pub valid_nodes: usize,
    pub index: IndexStats,
    pub timing: TimingBreakdown,
}
