use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::io::{CachedSnapshot, Workbook};
use crate::profile::{ProfileSet, SheetProfile};
use crate::rank::{RankOutcome, rank_sheet};

/// Selection that expands to every known profile.
pub const ALL_SHEETS: &str = "all";

/// One sheet to re-rank.
#[derive(Debug, Clone, PartialEq)]
pub struct SortRequest {
    /// Profile key or sheet name.
    pub sheet: String,
    /// Overrides the profile's default grouping when set.
    pub group_by_unit: Option<bool>,
}

impl SortRequest {
    pub fn new(sheet: impl Into<String>, group_by_unit: Option<bool>) -> Self {
        Self {
            sheet: sheet.into(),
            group_by_unit,
        }
    }

    /// Turns command-line selections into requests, expanding `all` to every
    /// profile in registry order.
    pub fn expand(profiles: &ProfileSet, selections: &[String], group_by_unit: Option<bool>) -> Vec<Self> {
        let mut requests: Vec<Self> = Vec::new();
        for selection in selections {
            if selection.trim().eq_ignore_ascii_case(ALL_SHEETS) {
                for profile in profiles.iter() {
                    requests.push(Self::new(profile.key.clone(), group_by_unit));
                }
            } else {
                requests.push(Self::new(selection.clone(), group_by_unit));
            }
        }
        requests
    }
}

/// Summary of one sheet's ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortReport {
    pub sheet: String,
    pub grouped: bool,
    pub first_row: Option<u32>,
    pub last_row: Option<u32>,
    pub rows: usize,
    pub groups: usize,
    pub coerced_inputs: usize,
    /// Source row of each output row, top to bottom.
    pub order: Vec<u32>,
}

impl SortReport {
    fn new(profile: &SheetProfile, grouped: bool, outcome: RankOutcome) -> Self {
        Self {
            sheet: profile.sheet_name.clone(),
            grouped,
            first_row: outcome.data_rows.map(|(first, _)| first),
            last_row: outcome.data_rows.map(|(_, last)| last),
            rows: outcome.order.len(),
            groups: outcome.groups,
            coerced_inputs: outcome.coerced_inputs,
            order: outcome.order,
        }
    }
}

/// Re-ranks one sheet of `input` using the built-in profiles and saves the
/// result to `output`.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display(), sheet = %sheet, group_by_unit = group_by_unit)
)]
pub fn sort(input: &Path, output: &Path, sheet: &str, group_by_unit: bool) -> Result<SortReport> {
    let requests = [SortRequest::new(sheet, Some(group_by_unit))];
    let mut reports = sort_sheets(input, output, &ProfileSet::builtin(), &requests)?;
    Ok(reports.remove(0))
}

/// Re-ranks every requested sheet in a single load and save.
///
/// All sheet identities are resolved before the workbook is opened, so an
/// unknown sheet never leaves a partially written output behind.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display(), requests = requests.len())
)]
pub fn sort_sheets(
    input: &Path,
    output: &Path,
    profiles: &ProfileSet,
    requests: &[SortRequest],
) -> Result<Vec<SortReport>> {
    let resolved = resolve_requests(profiles, requests)?;

    let mut workbook = Workbook::open(input)?;
    // Read cached values up front so the input is closed before an in-place save.
    let cached_values = {
        let mut snapshot = CachedSnapshot::open(input)?;
        resolved
            .iter()
            .map(|(profile, _)| snapshot.sheet(&profile.sheet_name))
            .collect::<Result<Vec<_>>>()?
    };
    let mut reports = Vec::with_capacity(resolved.len());

    for ((profile, grouped), cached) in resolved.into_iter().zip(cached_values) {
        let mut sheet = workbook.sheet_mut(&profile.sheet_name)?;
        let outcome = rank_sheet(&mut sheet, profile, grouped, &cached);
        info!(
            sheet = %profile.sheet_name,
            grouped,
            rows = outcome.order.len(),
            groups = outcome.groups,
            coerced_inputs = outcome.coerced_inputs,
            "sheet re-ranked"
        );
        reports.push(SortReport::new(profile, grouped, outcome));
    }

    workbook.save(output)?;
    info!(sheets = reports.len(), "workbook written");
    Ok(reports)
}

/// Resolves every request to its profile and effective grouping.
///
/// A sheet named more than once, by key or by sheet name, is ranked once with
/// the first request's grouping.
fn resolve_requests<'a>(
    profiles: &'a ProfileSet,
    requests: &[SortRequest],
) -> Result<Vec<(&'a SheetProfile, bool)>> {
    let mut resolved: Vec<(&SheetProfile, bool)> = Vec::with_capacity(requests.len());
    for request in requests {
        let profile = profiles.resolve(&request.sheet)?;
        if resolved.iter().any(|(seen, _)| seen.key == profile.key) {
            debug!(sheet = %profile.sheet_name, "sheet already selected, skipping repeat");
            continue;
        }
        resolved.push((profile, request.group_by_unit.unwrap_or(profile.group_by_unit)));
    }
    Ok(resolved)
}
