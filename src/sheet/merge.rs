use std::collections::HashMap;

/// Rectangular merged region, 1-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl MergedRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }

    /// Top-left cell, the only one that stores a value.
    pub fn anchor(&self) -> (u32, u32) {
        (self.min_row, self.min_col)
    }
}

/// Lookup from every merged non-anchor cell to the anchor of its range.
///
/// Built once per sheet so per-cell checks during write-back stay constant time.
#[derive(Debug, Default, Clone)]
pub struct MergeMap {
    anchors: HashMap<(u32, u32), (u32, u32)>,
}

impl MergeMap {
    pub fn new(ranges: &[MergedRange]) -> Self {
        let mut anchors = HashMap::new();
        for range in ranges {
            let anchor = range.anchor();
            for row in range.min_row..=range.max_row {
                for col in range.min_col..=range.max_col {
                    if (row, col) == anchor {
                        continue;
                    }
                    // Overlapping ranges are malformed; the first declaration wins.
                    anchors.entry((row, col)).or_insert(anchor);
                }
            }
        }
        Self { anchors }
    }

    /// True when `(row, col)` lies inside a merged range but is not its anchor.
    pub fn is_non_anchor(&self, row: u32, col: u32) -> bool {
        self.anchors.contains_key(&(row, col))
    }

    /// Anchor of the range covering a non-anchor cell.
    pub fn anchor_of(&self, row: u32, col: u32) -> Option<(u32, u32)> {
        self.anchors.get(&(row, col)).copied()
    }
}
