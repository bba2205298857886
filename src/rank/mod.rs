//! Row normalisation and ranking for a single template sheet.
//!
//! The transform reads every data row into a [`RowRecord`], scores it with the
//! profile's weights, reorders the records, and writes them back in place. The
//! sequence column and the score formula are regenerated afterwards, so their
//! original contents never influence the result.

use std::ops::Range;

use tracing::{debug, warn};

use crate::profile::SheetProfile;
use crate::sheet::{CachedValues, CellContent, MergeMap, Worksheet, column_letters};

/// One data row captured before reordering.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    /// Row the record was read from.
    pub source_row: u32,
    /// Contents of columns `1..=max_column`.
    pub cells: Vec<CellContent>,
    pub note: String,
    pub score: f64,
}

impl RowRecord {
    fn has_note(&self) -> bool {
        !self.note.is_empty()
    }

    fn cell(&self, col: u32) -> Option<&CellContent> {
        self.cells.get(slot(col)?)
    }
}

/// Position of 1-based column `col` in [`RowRecord::cells`].
fn slot(col: u32) -> Option<usize> {
    col.checked_sub(1).map(|index| index as usize)
}

/// What a ranking pass did to the sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankOutcome {
    /// Inclusive row span that was rewritten, `None` when the sheet had no data.
    pub data_rows: Option<(u32, u32)>,
    /// Number of independently sorted runs.
    pub groups: usize,
    /// Non-empty score inputs that were not numeric and counted as 0.
    pub coerced_inputs: usize,
    /// Source row of each output row, top to bottom.
    pub order: Vec<u32>,
}

/// Reorders the data rows of `sheet` according to `profile`.
///
/// `cached` supplies the last computed results of formula cells. They travel
/// with their formulas, so a moved input keeps the value it was scored with.
pub fn rank_sheet<S>(
    sheet: &mut S,
    profile: &SheetProfile,
    group_by_unit: bool,
    cached: &CachedValues,
) -> RankOutcome
where
    S: Worksheet + ?Sized,
{
    let first_row = profile.header_row + 1;
    let Some(last_row) = last_data_row(sheet, profile) else {
        debug!(sheet = %profile.sheet_name, "no data rows found");
        return RankOutcome::default();
    };

    let merges = MergeMap::new(&sheet.merged_ranges());
    let (records, coerced_inputs) =
        read_records(sheet, profile, group_by_unit, cached, &merges, first_row..last_row + 1);

    let (sorted, groups) = if group_by_unit {
        let runs = unit_runs(&records, profile);
        let groups = runs.len();
        (sort_grouped(records, runs), groups)
    } else {
        (sort_by_score(records), 1)
    };

    write_back(sheet, &sorted, first_row, &merges);
    rewrite_generated_columns(sheet, profile, sorted.len(), first_row, &merges);

    debug!(
        sheet = %profile.sheet_name,
        rows = sorted.len(),
        groups,
        coerced_inputs,
        "ranked rows"
    );

    RankOutcome {
        data_rows: Some((first_row, last_row)),
        groups,
        coerced_inputs,
        order: sorted.iter().map(|record| record.source_row).collect(),
    }
}

/// Last row below the header whose extent column is non-empty.
fn last_data_row<S>(sheet: &S, profile: &SheetProfile) -> Option<u32>
where
    S: Worksheet + ?Sized,
{
    let extent = profile.extent_column.index();
    ((profile.header_row + 1)..=sheet.max_row())
        .rev()
        .find(|row| !sheet.cell(*row, extent).is_empty())
}

fn read_records<S>(
    sheet: &S,
    profile: &SheetProfile,
    group_by_unit: bool,
    cached: &CachedValues,
    merges: &MergeMap,
    rows: Range<u32>,
) -> (Vec<RowRecord>, usize)
where
    S: Worksheet + ?Sized,
{
    let max_col = sheet
        .max_column()
        .max(profile.score_column.index())
        .max(profile.sequence_column.index());
    let mut coerced = 0;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let mut cells: Vec<CellContent> = (1..=max_col)
            .map(|col| sheet.cell(row, col).with_result(cached.get(row, col)))
            .collect();

        if group_by_unit {
            for col in [profile.name_column.index(), profile.unit_column.index()] {
                fill_from_anchor(sheet, merges, &mut cells, row, col);
            }
        }

        let note = profile
            .note_column
            .and_then(|col| cells.get(slot(col.index())?))
            .map(CellContent::as_text)
            .unwrap_or_default();

        let mut score = 0.0;
        for input in &profile.weights {
            let col = input.column.index();
            let content = slot(col).and_then(|idx| cells.get(idx)).cloned().unwrap_or_default();
            match content.as_number() {
                Some(value) => score += input.weight * value,
                None if content.is_empty() => {}
                None => {
                    coerced += 1;
                    warn!(
                        sheet = %profile.sheet_name,
                        cell = %format!("{}{row}", column_letters(col)),
                        value = %content.as_text(),
                        "score input is not numeric, counting it as 0"
                    );
                }
            }
        }

        records.push(RowRecord {
            source_row: row,
            cells,
            note,
            score,
        });
    }

    (records, coerced)
}

/// Copies the anchor value into an empty cell that belongs to a merged range
/// starting in the same column.
fn fill_from_anchor<S>(sheet: &S, merges: &MergeMap, cells: &mut [CellContent], row: u32, col: u32)
where
    S: Worksheet + ?Sized,
{
    let Some(target) = slot(col).and_then(|idx| cells.get_mut(idx)) else {
        return;
    };
    if !target.is_empty() {
        return;
    }
    if let Some((anchor_row, anchor_col)) = merges.anchor_of(row, col) {
        if anchor_col == col {
            *target = sheet.cell(anchor_row, anchor_col);
        }
    }
}

/// Splits records into contiguous runs sharing a unit. Rows with an empty unit
/// stay in the run that precedes them.
fn unit_runs(records: &[RowRecord], profile: &SheetProfile) -> Vec<Range<usize>> {
    let unit_col = profile.unit_column.index();
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<String> = None;

    for (idx, record) in records.iter().enumerate() {
        let unit = record.cell(unit_col).map(CellContent::as_text).unwrap_or_default();
        if unit.is_empty() {
            continue;
        }
        if current.as_ref().is_some_and(|prev| *prev != unit) {
            runs.push(start..idx);
            start = idx;
        }
        current = Some(unit);
    }
    runs.push(start..records.len());
    runs
}

fn sort_by_score(mut records: Vec<RowRecord>) -> Vec<RowRecord> {
    records.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score));
    records
}

fn sort_grouped(records: Vec<RowRecord>, runs: Vec<Range<usize>>) -> Vec<RowRecord> {
    let mut sorted = Vec::with_capacity(records.len());
    for run in runs {
        let mut group = records[run].to_vec();
        group.sort_by(|lhs, rhs| {
            lhs.has_note()
                .cmp(&rhs.has_note())
                .then_with(|| rhs.score.total_cmp(&lhs.score))
        });
        sorted.extend(group);
    }
    sorted
}

fn write_back<S>(sheet: &mut S, sorted: &[RowRecord], first_row: u32, merges: &MergeMap)
where
    S: Worksheet + ?Sized,
{
    for (row, record) in (first_row..).zip(sorted) {
        for (col, content) in (1..).zip(&record.cells) {
            if merges.is_non_anchor(row, col) {
                continue;
            }
            sheet.set_cell(row, col, content.clone());
        }
    }
}

fn rewrite_generated_columns<S>(
    sheet: &mut S,
    profile: &SheetProfile,
    count: usize,
    first_row: u32,
    merges: &MergeMap,
) where
    S: Worksheet + ?Sized,
{
    let sequence = profile.sequence_column.index();
    let score = profile.score_column.index();
    for (position, row) in (1..=count).zip(first_row..) {
        if !merges.is_non_anchor(row, sequence) {
            sheet.set_cell(row, sequence, CellContent::Number(position as f64));
        }
        if !merges.is_non_anchor(row, score) {
            sheet.set_cell(row, score, CellContent::formula(profile.score_formula(row)));
        }
    }
}
