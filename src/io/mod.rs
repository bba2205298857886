//! Workbook adapters: the editable `.xlsx` workbook and the cached-value
//! snapshot read alongside it.

pub mod snapshot;
pub mod workbook;

pub use snapshot::CachedSnapshot;
pub use workbook::{SheetHandle, Workbook};
