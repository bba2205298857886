//! Core library for the scoresheet-tools command line application.
//!
//! The library re-ranks rows of the evaluation workbook templates. Sheet
//! layouts live in [`profile`], the worksheet abstraction and merge handling in
//! [`sheet`], the ranking transform in [`rank`], workbook adapters under
//! [`io`], and the load/rank/save orchestration in [`sort`].

pub mod error;
pub mod io;
pub mod profile;
pub mod rank;
pub mod sheet;
pub mod sort;

pub use error::{Result, ToolError};
pub use profile::{ProfileSet, SheetProfile};
pub use sort::{SortReport, SortRequest, sort, sort_sheets};
