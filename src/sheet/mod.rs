//! Worksheet abstraction shared by the ranking logic and the workbook adapters.
//!
//! All coordinates are 1-based `(row, column)` pairs, matching how the
//! templates are described (row 7, column `H`).

use std::collections::HashMap;

mod merge;
mod reference;

pub use merge::{MergeMap, MergedRange};
pub use reference::{Column, column_index, column_letters, parse_range};

/// Content of a single cell as moved around by the normalizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellContent {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Error literal such as `#N/A`.
    Error(String),
    /// Formula text including the leading `=`, and its last computed result
    /// when one is known.
    Formula(String, Option<f64>),
}

impl CellContent {
    /// Builds a formula cell without a computed result, adding the leading `=`
    /// when it is missing.
    pub fn formula(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with('=') {
            CellContent::Formula(text, None)
        } else {
            CellContent::Formula(format!("={text}"), None)
        }
    }

    /// Records `value` as the result of a formula cell that has none yet.
    pub fn with_result(self, value: Option<f64>) -> Self {
        match self {
            CellContent::Formula(text, None) => CellContent::Formula(text, value),
            other => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellContent::Empty => true,
            CellContent::Text(text) => text.is_empty(),
            CellContent::Number(_)
            | CellContent::Bool(_)
            | CellContent::Error(_)
            | CellContent::Formula(..) => false,
        }
    }

    /// Numeric reading of the cell, accepting text that parses as a number and
    /// formulas with a known result.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellContent::Number(value) => Some(*value),
            CellContent::Text(text) => text.trim().parse::<f64>().ok(),
            CellContent::Formula(_, result) => *result,
            CellContent::Empty | CellContent::Bool(_) | CellContent::Error(_) => None,
        }
        .filter(|value| value.is_finite())
    }

    /// Display text used for grouping keys and notes.
    pub fn as_text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Number(value) => value.to_string(),
            CellContent::Text(text) | CellContent::Error(text) => text.clone(),
            CellContent::Bool(true) => "TRUE".to_string(),
            CellContent::Bool(false) => "FALSE".to_string(),
            CellContent::Formula(formula, _) => formula.clone(),
        }
    }
}

impl From<&str> for CellContent {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellContent::Empty
        } else {
            CellContent::Text(value.to_string())
        }
    }
}

impl From<f64> for CellContent {
    fn from(value: f64) -> Self {
        CellContent::Number(value)
    }
}

/// Cached numeric results keyed by `(row, col)`, as last computed by the
/// spreadsheet application that saved the file.
#[derive(Debug, Default, Clone)]
pub struct CachedValues {
    values: HashMap<(u32, u32), f64>,
}

impl CachedValues {
    pub fn insert(&mut self, row: u32, col: u32, value: f64) {
        if value.is_finite() {
            self.values.insert((row, col), value);
        }
    }

    pub fn get(&self, row: u32, col: u32) -> Option<f64> {
        self.values.get(&(row, col)).copied()
    }
}

/// Read-write access to one worksheet.
pub trait Worksheet {
    /// Returns the content stored at `(row, col)`.
    fn cell(&self, row: u32, col: u32) -> CellContent;

    /// Replaces the content stored at `(row, col)`.
    fn set_cell(&mut self, row: u32, col: u32, content: CellContent);

    /// Lists the merged ranges declared on the sheet.
    fn merged_ranges(&self) -> Vec<MergedRange>;

    /// Highest used row, 0 for an empty sheet.
    fn max_row(&self) -> u32;

    /// Highest used column, 0 for an empty sheet.
    fn max_column(&self) -> u32;
}
