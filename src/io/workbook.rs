use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use umya_spreadsheet::{CellRawValue, Spreadsheet, Worksheet as UmyaWorksheet};

use crate::error::{Result, ToolError};
use crate::sheet::{CellContent, MergedRange, Worksheet, parse_range};

/// Editable workbook loaded with styles, merges and formulas intact.
pub struct Workbook {
    book: Spreadsheet,
    source: PathBuf,
}

impl Workbook {
    /// Reads the workbook at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let book = umya_spreadsheet::reader::xlsx::read(path)?;
        debug!(path = %path.display(), sheets = book.get_sheet_count(), "workbook loaded");
        Ok(Self {
            book,
            source: path.to_path_buf(),
        })
    }

    /// Borrows the named sheet for editing.
    pub fn sheet_mut(&mut self, name: &str) -> Result<SheetHandle<'_>> {
        let worksheet = self
            .book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| ToolError::MissingSheet(name.to_string()))?;
        Ok(SheetHandle { worksheet })
    }

    /// Writes the workbook to `output`.
    ///
    /// The bytes go to a temporary file next to `output` which is renamed over
    /// it once fully written, so `output` is either the old file or the new
    /// one, also when it is the file the workbook was read from.
    pub fn save(&self, output: &Path) -> Result<()> {
        let directory = output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(directory)?;
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut staged)?;
        staged.as_file().sync_all()?;
        staged
            .persist(output)
            .map_err(|error| ToolError::Io(error.error))?;
        debug!(
            output = %output.display(),
            in_place = output == self.source,
            "workbook saved"
        );
        Ok(())
    }
}

/// [`Worksheet`] view over one sheet of a [`Workbook`].
pub struct SheetHandle<'a> {
    worksheet: &'a mut UmyaWorksheet,
}

impl Worksheet for SheetHandle<'_> {
    fn cell(&self, row: u32, col: u32) -> CellContent {
        let Some(cell) = self.worksheet.get_cell((col, row)) else {
            return CellContent::Empty;
        };
        if cell.is_formula() {
            let result = cell.get_value().trim().parse::<f64>().ok();
            return CellContent::formula(cell.get_formula()).with_result(result);
        }
        match cell.get_raw_value() {
            CellRawValue::Numeric(value) => CellContent::Number(*value),
            CellRawValue::Bool(value) => CellContent::Bool(*value),
            CellRawValue::Error(_) => CellContent::Error(cell.get_value().into_owned()),
            CellRawValue::Empty => CellContent::Empty,
            _ => CellContent::from(cell.get_value().as_ref()),
        }
    }

    fn set_cell(&mut self, row: u32, col: u32, content: CellContent) {
        match content {
            CellContent::Empty => {
                if self.worksheet.get_cell((col, row)).is_some() {
                    self.worksheet.get_cell_mut((col, row)).set_blank();
                }
            }
            CellContent::Number(value) => {
                self.worksheet.get_cell_mut((col, row)).set_value_number(value);
            }
            CellContent::Text(text) => {
                self.worksheet.get_cell_mut((col, row)).set_value_string(text);
            }
            CellContent::Bool(value) => {
                self.worksheet.get_cell_mut((col, row)).set_value_bool(value);
            }
            CellContent::Error(literal) => {
                // `set_value` parses error literals such as `#N/A` back into error cells.
                self.worksheet.get_cell_mut((col, row)).set_value(literal);
            }
            CellContent::Formula(formula, result) => {
                let cell = self.worksheet.get_cell_mut((col, row));
                // `set_formula` keeps the result the cell held before; drop it first.
                cell.set_blank();
                cell.set_formula(formula.trim_start_matches('=').to_string());
                if let Some(value) = result {
                    cell.set_formula_result_default(value.to_string());
                }
            }
        }
    }

    fn merged_ranges(&self) -> Vec<MergedRange> {
        self.worksheet
            .get_merge_cells()
            .iter()
            .filter_map(|range| {
                let a1 = range.get_range();
                match parse_range(&a1) {
                    Ok(parsed) => Some(parsed),
                    Err(error) => {
                        warn!(range = %a1, %error, "skipping unreadable merged range");
                        None
                    }
                }
            })
            .collect()
    }

    fn max_row(&self) -> u32 {
        self.worksheet.get_highest_row()
    }

    fn max_column(&self) -> u32 {
        self.worksheet.get_highest_column()
    }
}
