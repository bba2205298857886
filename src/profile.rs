//! Per-sheet layout and scoring configuration.
//!
//! Each template sheet is described by a [`SheetProfile`]. The two built-in
//! profiles cover the staff and leadership evaluation sheets; additional or
//! replacement profiles can be loaded from a JSON document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::sheet::Column;

/// Placeholder substituted with the row number in formula templates.
pub const ROW_PLACEHOLDER: &str = "{r}";

/// Sheet name of the staff evaluation template.
pub const STAFF_SHEET: &str = "非正职公务员";
/// Sheet name of the leadership evaluation template.
pub const LEADERSHIP_SHEET: &str = "主要领导";

/// One weighted score input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedColumn {
    pub column: Column,
    pub weight: f64,
}

/// Layout and scoring rules for one template sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetProfile {
    /// Short identifier accepted on the command line (`staff`, `leadership`).
    pub key: String,
    /// Worksheet name inside the workbook.
    pub sheet_name: String,
    /// Last header row; data starts on the following row.
    pub header_row: u32,
    pub sequence_column: Column,
    pub name_column: Column,
    pub unit_column: Column,
    #[serde(default)]
    pub note_column: Option<Column>,
    pub score_column: Column,
    /// Column scanned bottom-up to find the last data row.
    pub extent_column: Column,
    pub weights: Vec<WeightedColumn>,
    /// Score formula with `{r}` standing for the row number.
    pub formula_template: String,
    /// Whether rows are grouped by unit unless the caller says otherwise.
    #[serde(default)]
    pub group_by_unit: bool,
}

impl SheetProfile {
    /// Profile for the `非正职公务员` sheet.
    pub fn staff() -> Self {
        Self {
            key: "staff".to_string(),
            sheet_name: STAFF_SHEET.to_string(),
            header_row: 6,
            sequence_column: Column(1),
            name_column: Column(2),
            unit_column: Column(3),
            note_column: Some(Column(9)),
            score_column: Column(8),
            extent_column: Column(8),
            weights: vec![
                WeightedColumn {
                    column: Column(5),
                    weight: 0.35,
                },
                WeightedColumn {
                    column: Column(6),
                    weight: 0.30,
                },
                WeightedColumn {
                    column: Column(7),
                    weight: 0.35,
                },
            ],
            formula_template: "=SUM(E{r}*35%+F{r}*30%+G{r}*35%)".to_string(),
            group_by_unit: true,
        }
    }

    /// Profile for the `主要领导` sheet.
    pub fn leadership() -> Self {
        Self {
            key: "leadership".to_string(),
            sheet_name: LEADERSHIP_SHEET.to_string(),
            header_row: 4,
            sequence_column: Column(1),
            name_column: Column(2),
            unit_column: Column(3),
            note_column: None,
            score_column: Column(8),
            extent_column: Column(8),
            weights: vec![
                WeightedColumn {
                    column: Column(4),
                    weight: 0.35,
                },
                WeightedColumn {
                    column: Column(5),
                    weight: 0.25,
                },
                WeightedColumn {
                    column: Column(6),
                    weight: 0.20,
                },
                WeightedColumn {
                    column: Column(7),
                    weight: 0.20,
                },
            ],
            formula_template: "=D{r}*35%+E{r}*25%+F{r}*20%+G{r}*20%".to_string(),
            group_by_unit: false,
        }
    }

    /// Renders the score formula for `row`.
    pub fn score_formula(&self, row: u32) -> String {
        self.formula_template.replace(ROW_PLACEHOLDER, &row.to_string())
    }

    /// True when `identity` names this profile by key or sheet name.
    pub fn matches(&self, identity: &str) -> bool {
        let identity = identity.trim();
        identity == self.sheet_name || identity.eq_ignore_ascii_case(&self.key)
    }

    fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        [
            self.sequence_column,
            self.name_column,
            self.unit_column,
            self.score_column,
            self.extent_column,
        ]
        .into_iter()
        .chain(self.note_column)
        .chain(self.weights.iter().map(|entry| entry.column))
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ToolError::InvalidProfile {
            key: self.key.clone(),
            reason: reason.to_string(),
        };
        if self.key.trim().is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(invalid("sheet_name must not be empty"));
        }
        if self.header_row == 0 {
            return Err(invalid("header_row must be at least 1"));
        }
        if self.columns().any(|column| column.index() == 0) {
            return Err(invalid("columns are 1-based"));
        }
        if self.weights.is_empty() {
            return Err(invalid("at least one weighted column is required"));
        }
        if self.weights.iter().any(|entry| !entry.weight.is_finite()) {
            return Err(invalid("weights must be finite numbers"));
        }
        if !self.formula_template.contains(ROW_PLACEHOLDER) {
            return Err(invalid("formula_template must contain {r}"));
        }
        Ok(())
    }
}

/// Ordered collection of known sheet profiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProfileSet {
    profiles: Vec<SheetProfile>,
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileSet {
    /// The staff and leadership profiles, in that order.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![SheetProfile::staff(), SheetProfile::leadership()],
        }
    }

    /// Builds a set from explicit profiles after validating each one.
    pub fn new(profiles: Vec<SheetProfile>) -> Result<Self> {
        let mut set = Self { profiles: Vec::new() };
        for profile in profiles {
            if set.profiles.iter().any(|existing| existing.key == profile.key) {
                return Err(ToolError::InvalidProfile {
                    key: profile.key,
                    reason: "duplicate key".to_string(),
                });
            }
            profile.validate()?;
            set.profiles.push(profile);
        }
        Ok(set)
    }

    /// Loads a JSON array of profiles and layers it over the built-ins.
    ///
    /// Entries whose key matches a built-in replace it in place; other entries
    /// are appended.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let overrides: Vec<SheetProfile> = serde_json::from_str(&data)?;
        let overrides = Self::new(overrides)?;
        debug!(count = overrides.len(), path = %path.display(), "loaded sheet profiles");
        Ok(Self::builtin().merged_with(overrides))
    }

    fn merged_with(mut self, overrides: ProfileSet) -> Self {
        for profile in overrides.profiles {
            match self.profiles.iter_mut().find(|existing| existing.key == profile.key) {
                Some(existing) => *existing = profile,
                None => self.profiles.push(profile),
            }
        }
        self
    }

    /// Finds the profile named by `identity` (key or sheet name).
    pub fn resolve(&self, identity: &str) -> Result<&SheetProfile> {
        self.profiles
            .iter()
            .find(|profile| profile.matches(identity))
            .ok_or_else(|| ToolError::UnrecognizedSheet(identity.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SheetProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
