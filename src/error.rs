use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads, re-ranks, or saves a workbook.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a JSON profile document cannot be parsed or printed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the editable workbook implementation.
    #[error("workbook error: {0}")]
    Workbook(#[from] umya_spreadsheet::XlsxError),

    /// Errors bubbled up from the cached-value reader.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the requested sheet identity matches no known profile.
    #[error("unrecognized sheet '{0}'")]
    UnrecognizedSheet(String),

    /// Raised when the workbook does not contain the sheet a profile targets.
    #[error("invalid workbook structure: missing sheet '{0}'")]
    MissingSheet(String),

    /// Raised when a profile definition fails validation.
    #[error("invalid profile '{key}': {reason}")]
    InvalidProfile { key: String, reason: String },

    /// Raised when a column letter or A1 reference cannot be parsed.
    #[error("invalid cell reference '{0}'")]
    InvalidReference(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
