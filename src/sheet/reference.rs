use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::MergedRange;
use crate::error::{Result, ToolError};

/// A 1-based column index that reads and prints as spreadsheet letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column(pub u32);

impl Column {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl FromStr for Column {
    type Err = ToolError;

    fn from_str(letters: &str) -> Result<Self> {
        column_index(letters).map(Column)
    }
}

impl TryFrom<String> for Column {
    type Error = ToolError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Column> for String {
    fn from(column: Column) -> Self {
        column_letters(column.0)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&column_letters(self.0))
    }
}

/// Converts column letters (`A`, `H`, `AB`) into a 1-based index.
pub fn column_index(letters: &str) -> Result<u32> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidReference(letters.to_string()));
    }
    let mut value: u32 = 0;
    for ch in trimmed.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ToolError::InvalidReference(letters.to_string()));
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        value = value
            .checked_mul(26)
            .and_then(|value| value.checked_add(digit))
            .ok_or_else(|| ToolError::InvalidReference(letters.to_string()))?;
    }
    Ok(value)
}

/// Converts a 1-based column index into letters. Index 0 yields an empty string.
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parses an A1 cell reference such as `C12` (absolute markers allowed) into
/// `(row, col)`.
fn parse_cell(a1: &str) -> Result<(u32, u32)> {
    let cleaned: String = a1.chars().filter(|ch| *ch != '$').collect();
    let split = cleaned
        .find(|ch: char| ch.is_ascii_digit())
        .ok_or_else(|| ToolError::InvalidReference(a1.to_string()))?;
    let (letters, digits) = cleaned.split_at(split);
    let col = column_index(letters).map_err(|_| ToolError::InvalidReference(a1.to_string()))?;
    let row: u32 = digits
        .parse()
        .map_err(|_| ToolError::InvalidReference(a1.to_string()))?;
    if row == 0 {
        return Err(ToolError::InvalidReference(a1.to_string()));
    }
    Ok((row, col))
}

/// Parses an A1 range such as `B7:C9`. A single cell reference yields a 1x1
/// range.
pub fn parse_range(range: &str) -> Result<MergedRange> {
    let mut parts = range.trim().split(':');
    let first = parts
        .next()
        .ok_or_else(|| ToolError::InvalidReference(range.to_string()))?;
    let (r0, c0) = parse_cell(first)?;
    let (r1, c1) = match parts.next() {
        Some(second) => parse_cell(second)?,
        None => (r0, c0),
    };
    if parts.next().is_some() {
        return Err(ToolError::InvalidReference(range.to_string()));
    }
    Ok(MergedRange {
        min_row: r0.min(r1),
        max_row: r0.max(r1),
        min_col: c0.min(c1),
        max_col: c0.max(c1),
    })
}
