use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use scoresheet_tools::profile::{LEADERSHIP_SHEET, STAFF_SHEET};
use scoresheet_tools::{ProfileSet, SortRequest, ToolError, sort, sort_sheets};
use tempfile::tempdir;

struct Person {
    name: &'static str,
    unit: &'static str,
    scores: [f64; 3],
    note: &'static str,
}

fn person(name: &'static str, unit: &'static str, scores: [f64; 3], note: &'static str) -> Person {
    Person {
        name,
        unit,
        scores,
        note,
    }
}

/// Writes the staff sheet: title rows, header on row 6, data from row 7.
/// `merged_units` lists inclusive 1-based row spans whose unit cells are merged.
fn write_staff_sheet<'a>(
    workbook: &'a mut Workbook,
    people: &[Person],
    merged_units: &[(u32, u32)],
) -> &'a mut Worksheet {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(STAFF_SHEET).expect("sheet named");
    worksheet.write_string(0, 0, "年度考核评分表").expect("title");
    for (col, header) in ["序号", "姓名", "单位", "", "指标一", "指标二", "指标三", "总分", "备注"]
        .iter()
        .enumerate()
    {
        worksheet.write_string(5, col as u16, *header).expect("header");
    }

    for (offset, entry) in people.iter().enumerate() {
        let row = 6 + offset as u32;
        let excel_row = row + 1;
        let inside_merge = merged_units
            .iter()
            .any(|(first, last)| excel_row > *first && excel_row <= *last);
        worksheet.write_number(row, 0, (offset + 1) as f64).expect("sequence");
        worksheet.write_string(row, 1, entry.name).expect("name");
        if !inside_merge && !merged_units.iter().any(|(first, _)| *first == excel_row) {
            worksheet.write_string(row, 2, entry.unit).expect("unit");
        }
        for (idx, score) in entry.scores.iter().enumerate() {
            worksheet.write_number(row, 4 + idx as u16, *score).expect("score");
        }
        worksheet
            .write_formula(row, 7, Formula::new(format!("=E{excel_row}+F{excel_row}+G{excel_row}")))
            .expect("formula");
        if !entry.note.is_empty() {
            worksheet.write_string(row, 8, entry.note).expect("note");
        }
    }

    for (first, last) in merged_units {
        let unit = people[(*first - 7) as usize].unit;
        worksheet
            .merge_range(*first - 1, 2, *last - 1, 2, unit, &Format::new())
            .expect("merged unit");
    }
    worksheet
}

/// Writes the leadership sheet: header on row 4, data from row 5.
fn write_leadership_sheet(workbook: &mut Workbook, people: &[(&str, [f64; 4])]) {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(LEADERSHIP_SHEET).expect("sheet named");
    for (col, header) in ["序号", "姓名", "单位", "指标一", "指标二", "指标三", "指标四", "总分"]
        .iter()
        .enumerate()
    {
        worksheet.write_string(3, col as u16, *header).expect("header");
    }
    for (offset, (name, scores)) in people.iter().enumerate() {
        let row = 4 + offset as u32;
        worksheet.write_number(row, 0, (offset + 1) as f64).expect("sequence");
        worksheet.write_string(row, 1, *name).expect("name");
        for (idx, score) in scores.iter().enumerate() {
            worksheet.write_number(row, 3 + idx as u16, *score).expect("score");
        }
        worksheet
            .write_formula(row, 7, Formula::new(format!("=SUM(D{0}:G{0})", row + 1)))
            .expect("formula");
    }
}

fn values(path: &Path, sheet: &str) -> Range<DataType> {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("workbook opened");
    workbook
        .worksheet_range(sheet)
        .expect("sheet present")
        .expect("sheet read")
}

fn formula(path: &Path, sheet: &str, row: u32, col: u32) -> String {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("workbook opened");
    let formulas = workbook
        .worksheet_formula(sheet)
        .expect("sheet present")
        .expect("formulas read");
    formulas
        .get_value((row - 1, col - 1))
        .map(|text| text.trim_start_matches('=').to_string())
        .unwrap_or_default()
}

/// Text of a 1-based cell, with empty cells and empty strings both as "".
fn text(range: &Range<DataType>, row: u32, col: u32) -> String {
    match range.get_value((row - 1, col - 1)) {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn number(range: &Range<DataType>, row: u32, col: u32) -> Option<f64> {
    match range.get_value((row - 1, col - 1)) {
        Some(DataType::Float(value)) => Some(*value),
        Some(DataType::Int(value)) => Some(*value as f64),
        _ => None,
    }
}

#[test]
fn staff_sheet_is_ranked_by_weighted_score() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(
        &mut workbook,
        &[
            person("甲", "", [80.0, 90.0, 70.0], ""),
            person("乙", "", [90.0, 80.0, 90.0], ""),
            person("丙", "", [70.0, 70.0, 70.0], ""),
        ],
        &[],
    );
    workbook.save(&input).expect("fixture saved");

    let report = sort(&input, &output, STAFF_SHEET, false).expect("sheet sorted");

    assert_eq!(report.order, vec![8, 7, 9]);
    assert_eq!(report.first_row, Some(7));
    assert_eq!(report.last_row, Some(9));

    let range = values(&output, STAFF_SHEET);
    let names: Vec<String> = (7..=9).map(|row| text(&range, row, 2)).collect();
    assert_eq!(names, vec!["乙", "甲", "丙"]);
    assert_eq!(
        (number(&range, 7, 5), number(&range, 7, 6), number(&range, 7, 7)),
        (Some(90.0), Some(80.0), Some(90.0))
    );
    let sequence: Vec<Option<f64>> = (7..=9).map(|row| number(&range, row, 1)).collect();
    assert_eq!(sequence, vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(text(&range, 6, 8), "总分");
    assert_eq!(text(&range, 1, 1), "年度考核评分表");

    for row in 7..=9 {
        assert_eq!(
            formula(&output, STAFF_SHEET, row, 8),
            format!("SUM(E{row}*35%+F{row}*30%+G{row}*35%)")
        );
    }
}

#[test]
fn grouped_staff_sheet_keeps_units_and_merges() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(
        &mut workbook,
        &[
            person("a1", "甲单位", [60.0, 60.0, 60.0], ""),
            person("a2", "甲单位", [90.0, 90.0, 90.0], ""),
            person("b1", "乙单位", [90.0, 90.0, 90.0], "调入"),
            person("b2", "乙单位", [50.0, 50.0, 50.0], ""),
        ],
        &[(7, 8), (9, 10)],
    );
    workbook.save(&input).expect("fixture saved");

    let report = sort(&input, &output, "staff", true).expect("sheet sorted");

    assert_eq!(report.groups, 2);
    assert_eq!(report.order, vec![8, 7, 10, 9]);

    let range = values(&output, STAFF_SHEET);
    let names: Vec<String> = (7..=10).map(|row| text(&range, row, 2)).collect();
    assert_eq!(names, vec!["a2", "a1", "b2", "b1"]);
    let units: Vec<String> = (7..=10).map(|row| text(&range, row, 3)).collect();
    assert_eq!(units, vec!["甲单位", "", "乙单位", ""]);
    assert_eq!(text(&range, 9, 9), "");
    assert_eq!(text(&range, 10, 9), "调入");

    let book = umya_spreadsheet::reader::xlsx::read(&output).expect("output readable");
    let sheet = book.get_sheet_by_name(STAFF_SHEET).expect("staff sheet");
    assert_eq!(sheet.get_merge_cells().len(), 2);
}

#[test]
fn all_selection_sorts_both_sheets_in_one_save() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(
        &mut workbook,
        &[
            person("a1", "甲单位", [60.0, 60.0, 60.0], ""),
            person("a2", "甲单位", [70.0, 70.0, 70.0], ""),
        ],
        &[],
    );
    write_leadership_sheet(
        &mut workbook,
        &[
            ("L1", [70.0, 70.0, 70.0, 70.0]),
            ("L2", [95.0, 60.0, 60.0, 60.0]),
            ("L3", [80.0, 80.0, 80.0, 80.0]),
        ],
    );
    workbook.save(&input).expect("fixture saved");

    let profiles = ProfileSet::builtin();
    let requests = SortRequest::expand(&profiles, &["all".to_string()], None);
    let reports = sort_sheets(&input, &output, &profiles, &requests).expect("sheets sorted");

    assert_eq!(reports.len(), 2);
    assert!(reports[0].grouped);
    assert!(!reports[1].grouped);

    let staff = values(&output, STAFF_SHEET);
    assert_eq!(text(&staff, 7, 2), "a2");
    assert_eq!(text(&staff, 8, 2), "a1");

    // L2 = 95*.35 + 60*.65 = 72.25, between L3 (80) and L1 (70).
    let leadership = values(&output, LEADERSHIP_SHEET);
    let names: Vec<String> = (5..=7).map(|row| text(&leadership, row, 2)).collect();
    assert_eq!(names, vec!["L3", "L2", "L1"]);
    assert_eq!(
        formula(&output, LEADERSHIP_SHEET, 6, 8),
        "D6*35%+E6*25%+F6*20%+G6*20%"
    );
}

#[test]
fn in_place_sort_reaches_a_fixed_point() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("scores.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(
        &mut workbook,
        &[
            person("a1", "甲单位", [60.0, 60.0, 60.0], "借调"),
            person("a2", "甲单位", [50.0, 50.0, 50.0], ""),
            person("b1", "乙单位", [40.0, 40.0, 40.0], ""),
        ],
        &[],
    );
    workbook.save(&path).expect("fixture saved");

    let first = sort(&path, &path, STAFF_SHEET, true).expect("first pass");
    assert_eq!(first.order, vec![8, 7, 9]);
    let after_first = values(&path, STAFF_SHEET);

    let second = sort(&path, &path, STAFF_SHEET, true).expect("second pass");
    assert_eq!(second.order, vec![7, 8, 9]);

    let after_second = values(&path, STAFF_SHEET);
    for row in 7..=9 {
        for col in 1..=9 {
            assert_eq!(text(&after_first, row, col), text(&after_second, row, col));
        }
    }
    let leftovers = std::fs::read_dir(dir.path()).expect("dir listed").count();
    assert_eq!(leftovers, 1);
}

#[test]
fn formula_inputs_keep_their_results_when_moved() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let first_output = dir.path().join("first.xlsx");
    let second_output = dir.path().join("second.xlsx");
    let mut workbook = Workbook::new();
    let staff = write_staff_sheet(
        &mut workbook,
        &[
            person("a", "", [0.0, 0.0, 0.0], ""),
            person("b", "", [0.0, 0.0, 0.0], ""),
            person("c", "", [0.0, 0.0, 0.0], ""),
        ],
        &[],
    );
    // Every score input of row 7 + k points at Src!A(k + 1).
    for (offset, result) in [50.0, 90.0, 70.0].iter().enumerate() {
        let row = 6 + offset as u32;
        for col in 4..=6 {
            let source = Formula::new(format!("=Src!A{}", offset + 1)).set_result(result.to_string());
            staff.write_formula(row, col, source).expect("input formula");
        }
    }
    let src = workbook.add_worksheet();
    src.set_name("Src").expect("sheet named");
    for (offset, result) in [50.0, 90.0, 70.0].iter().enumerate() {
        src.write_number(offset as u32, 0, *result).expect("source value");
    }
    workbook.save(&input).expect("fixture saved");

    let first = sort(&input, &first_output, STAFF_SHEET, false).expect("first pass");
    assert_eq!(first.order, vec![8, 9, 7]);

    let range = values(&first_output, STAFF_SHEET);
    let names: Vec<String> = (7..=9).map(|row| text(&range, row, 2)).collect();
    assert_eq!(names, vec!["b", "c", "a"]);
    assert_eq!(text(&range, 7, 5), "90");
    assert_eq!(text(&range, 9, 7), "50");
    assert_eq!(formula(&first_output, STAFF_SHEET, 7, 5), "Src!A2");

    let second = sort(&first_output, &second_output, STAFF_SHEET, false).expect("second pass");
    assert_eq!(second.order, vec![7, 8, 9]);
}

#[test]
fn boolean_cells_stay_booleans() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    let staff = write_staff_sheet(
        &mut workbook,
        &[
            person("a", "", [50.0, 50.0, 50.0], ""),
            person("b", "", [90.0, 90.0, 90.0], ""),
        ],
        &[],
    );
    staff.write_boolean(6, 9, false).expect("flag");
    staff.write_boolean(7, 9, true).expect("flag");
    workbook.save(&input).expect("fixture saved");

    sort(&input, &output, STAFF_SHEET, false).expect("sheet sorted");

    let range = values(&output, STAFF_SHEET);
    assert_eq!(text(&range, 7, 2), "b");
    assert_eq!(range.get_value((6, 9)), Some(&DataType::Bool(true)));
    assert_eq!(range.get_value((7, 9)), Some(&DataType::Bool(false)));
}

#[test]
fn repeated_sheet_selection_sorts_once() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(
        &mut workbook,
        &[
            person("a", "", [50.0, 50.0, 50.0], ""),
            person("b", "", [90.0, 90.0, 90.0], ""),
        ],
        &[],
    );
    workbook.save(&input).expect("fixture saved");

    let profiles = ProfileSet::builtin();
    let selections = ["staff".to_string(), STAFF_SHEET.to_string()];
    let requests = SortRequest::expand(&profiles, &selections, Some(false));
    let reports = sort_sheets(&input, &output, &profiles, &requests).expect("sheets sorted");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].order, vec![8, 7]);
    let range = values(&output, STAFF_SHEET);
    assert_eq!(text(&range, 7, 2), "b");
}

#[test]
fn unrecognized_sheet_fails_before_writing() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(&mut workbook, &[person("a", "", [1.0, 1.0, 1.0], "")], &[]);
    workbook.save(&input).expect("fixture saved");

    let error = sort(&input, &output, "Sheet1", false).expect_err("unknown sheet rejected");

    assert!(matches!(error, ToolError::UnrecognizedSheet(ref name) if name == "Sheet1"));
    assert!(!output.exists());
}

#[test]
fn known_profile_missing_from_workbook_is_reported() {
    let dir = tempdir().expect("temporary directory");
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");
    let mut workbook = Workbook::new();
    write_staff_sheet(&mut workbook, &[person("a", "", [1.0, 1.0, 1.0], "")], &[]);
    workbook.save(&input).expect("fixture saved");

    let error = sort(&input, &output, "leadership", false).expect_err("missing sheet rejected");

    assert!(matches!(error, ToolError::MissingSheet(ref name) if name == LEADERSHIP_SHEET));
    assert!(!output.exists());
}
