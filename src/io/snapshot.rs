use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::error::{Result, ToolError};
use crate::sheet::CachedValues;

/// Read-only view of the values the spreadsheet application last computed.
///
/// Score inputs are sometimes formulas pulling from other sheets; the editable
/// workbook only sees the formula text, so their numbers come from here.
pub struct CachedSnapshot {
    workbook: Xlsx<BufReader<File>>,
}

impl CachedSnapshot {
    pub fn open(path: &Path) -> Result<Self> {
        let workbook: Xlsx<_> = open_workbook(path)?;
        Ok(Self { workbook })
    }

    /// Collects every numeric cell of `name` keyed by 1-based `(row, col)`.
    pub fn sheet(&mut self, name: &str) -> Result<CachedValues> {
        let range = self
            .workbook
            .worksheet_range(name)
            .ok_or_else(|| ToolError::MissingSheet(name.to_string()))??;

        let mut values = CachedValues::default();
        let Some((first_row, first_col)) = range.start() else {
            return Ok(values);
        };

        for (row_offset, row) in range.rows().enumerate() {
            for (col_offset, cell) in row.iter().enumerate() {
                let number = match cell {
                    DataType::Float(value) => *value,
                    DataType::Int(value) => *value as f64,
                    _ => continue,
                };
                values.insert(
                    first_row + row_offset as u32 + 1,
                    first_col + col_offset as u32 + 1,
                    number,
                );
            }
        }
        Ok(values)
    }
}
