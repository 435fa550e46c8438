use crate::types::Bounds;

/// Buckets beyond this many per indexed quad trigger a coarser cell size.
const BUCKETS_PER_QUAD: usize = 4;
const MIN_BUCKETS: usize = 1024;

/// Uniform grid of buckets over target space. Each bucket lists the ids of
/// the quads whose (expanded) bounding box overlaps it.
pub(crate) struct BucketGrid {
    min_x: f64,
    min_y: f64,
    cell: f64,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<u32>>,
}

impl BucketGrid {
    /// Empty grid covering `extent`, with cells near `cell_hint` on a side.
    pub(crate) fn new(extent: Bounds, cell_hint: f64, expected_items: usize) -> Self {
        if extent.is_empty() {
            return Self {
                min_x: 0.0,
                min_y: 0.0,
                cell: 1.0,
                cols: 0,
                rows: 0,
                buckets: Vec::new(),
            };
        }
        let mut cell = if cell_hint.is_finite() && cell_hint > 0.0 {
            cell_hint
        } else {
            extent.width().max(extent.height()).max(1.0)
        };
        let budget = (expected_items * BUCKETS_PER_QUAD).max(MIN_BUCKETS) as f64;
        let needed = (extent.width() / cell + 1.0) * (extent.height() / cell + 1.0);
        if needed > budget {
            cell *= (needed / budget).sqrt();
        }
        let cols = (extent.width() / cell).floor() as usize + 1;
        let rows = (extent.height() / cell).floor() as usize + 1;
        Self {
            min_x: extent.min_x,
            min_y: extent.min_y,
            cell,
            cols,
            rows,
            buckets: vec![Vec::new(); cols * rows],
        }
    }

    pub(crate) fn insert(&mut self, id: u32, bounds: &Bounds) {
        let Some((c0, r0)) = self.clamped_cell(bounds.min_x, bounds.min_y) else {
            return;
        };
        let Some((c1, r1)) = self.clamped_cell(bounds.max_x, bounds.max_y) else {
            return;
        };
        for r in r0..=r1 {
            for c in c0..=c1 {
                self.buckets[r * self.cols + c].push(id);
            }
        }
    }

    /// Ids of the quads that may contain `(x, y)`, in insertion order.
    pub(crate) fn candidates(&self, x: f64, y: f64) -> &[u32] {
        if !x.is_finite() || !y.is_finite() || self.buckets.is_empty() {
            return &[];
        }
        let fc = ((x - self.min_x) / self.cell).floor();
        let fr = ((y - self.min_y) / self.cell).floor();
        if fc < 0.0 || fr < 0.0 || fc >= self.cols as f64 || fr >= self.rows as f64 {
            return &[];
        }
        &self.buckets[fr as usize * self.cols + fc as usize]
    }

    pub(crate) fn cell_size(&self) -> f64 {
        self.cell
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn max_bucket_len(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn clamped_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if self.buckets.is_empty() || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let c = ((x - self.min_x) / self.cell).floor().max(0.0) as usize;
        let r = ((y - self.min_y) / self.cell).floor().max(0.0) as usize;
        Some((c.min(self.cols - 1), r.min(self.rows - 1)))
    }
}
