//! Structured reports returned by the `*_with_diagnostics` entry points.

mod report;
mod timing;

pub use report::{ComposeCounts, ComposeReport, IndexStats, InvertReport};
pub use timing::{StageTiming, TimingBreakdown};
