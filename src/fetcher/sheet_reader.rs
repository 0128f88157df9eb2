use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{CellValue, RawSheet};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("cannot open workbook {path}: {message}")]
    Open { path: String, message: String },
    #[error("workbook {0} has no worksheet")]
    NoWorksheet(String),
    #[error("first worksheet of {0} has no header row")]
    NoHeader(String),
}

/// Reads the first worksheet of any workbook format calamine understands.
pub fn read_sheet(path: &Path) -> Result<RawSheet, SheetError> {
    let display = path.display().to_string();
    let open_error = |message: String| SheetError::Open {
        path: display.clone(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| open_error(e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetError::NoWorksheet(display.clone()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| open_error(e.to_string()))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    sheet_from_rows(&sheet_name, rows).ok_or(SheetError::NoHeader(display))
}

/// Splits raw rows into header and data. Returns `None` when there is no header row.
pub fn sheet_from_rows(sheet_name: &str, mut rows: Vec<Vec<CellValue>>) -> Option<RawSheet> {
    if rows.is_empty() {
        return None;
    }
    let header_cells = rows.remove(0);
    if header_cells.iter().all(CellValue::is_empty) {
        return None;
    }

    let headers = unique_headers(&header_cells);

    while rows.last().is_some_and(|row| row.iter().all(CellValue::is_empty)) {
        rows.pop();
    }
    for row in &mut rows {
        if row.len() < headers.len() {
            row.resize(headers.len(), CellValue::Empty);
        }
    }

    Some(RawSheet {
        sheet_name: sheet_name.to_string(),
        headers,
        rows,
    })
}

/// Header names with blanks named by position and repeats suffixed `.1`, `.2`, ...
fn unique_headers(cells: &[CellValue]) -> Vec<String> {
    let mut seen = HashSet::new();

    cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = cell.render().unwrap_or_else(|| format!("Unnamed: {}", idx));
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Float(dt.as_f64())),
        Data::Error(e) => CellValue::Error(e.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

/// Spreadsheets in `dir` with one of `extensions`, ordered by file name.
/// Office lock files (`~$...`) are skipped.
pub fn discover_spreadsheets(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list data directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with("~$") {
            continue;
        }
        if has_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_header_and_rows() {
        let rows = vec![
            vec![text("校区"), text("考试时间")],
            vec![text("仙林"), text("2025年11月15日(10:25-12:15)")],
            vec![text("仙林")],
            vec![CellValue::Empty, CellValue::Empty],
        ];

        let sheet = sheet_from_rows("Sheet1", rows).unwrap();
        assert_eq!(sheet.headers, vec!["校区", "考试时间"]);
        // Trailing blank rows are dropped, short rows padded.
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.rows[1], vec![text("仙林"), CellValue::Empty]);
    }

    #[test]
    fn test_interior_blank_rows_are_kept() {
        let rows = vec![
            vec![text("考试时间")],
            vec![CellValue::Empty],
            vec![text("2025-11-18 13:30-15:20")],
        ];
        let sheet = sheet_from_rows("Sheet1", rows).unwrap();
        assert_eq!(sheet.height(), 2);
    }

    #[test]
    fn test_unique_headers() {
        let headers = unique_headers(&[
            text("班级"),
            CellValue::Empty,
            text("班级"),
            text("班级"),
            CellValue::Float(2025.0),
        ]);
        assert_eq!(headers, vec!["班级", "Unnamed: 1", "班级.1", "班级.2", "2025"]);
    }

    #[test]
    fn test_missing_header() {
        assert!(sheet_from_rows("Sheet1", Vec::new()).is_none());
        assert!(sheet_from_rows("Sheet1", vec![vec![CellValue::Empty]]).is_none());
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(convert_cell(&Data::Float(3.0)), CellValue::Float(3.0));
        assert_eq!(convert_cell(&Data::String("x".to_string())), text("x"));
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2025-11-15T10:25:00".to_string())),
            text("2025-11-15T10:25:00")
        );
    }

    #[test]
    fn test_convert_excel_date_cell() {
        // Serial 45976.5 is 2025-11-15 at noon.
        let serial = ExcelDateTime::new(45976.5, ExcelDateTimeType::DateTime, false);
        let cell = convert_cell(&Data::DateTime(serial));

        let expected = NaiveDate::from_ymd_opt(2025, 11, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(cell, CellValue::DateTime(expected));
        assert_eq!(cell.render().as_deref(), Some("2025-11-15 12:00:00"));
    }

    #[test]
    fn test_discover_spreadsheets() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLS", "~$b.xlsx", "notes.txt", "source_metadata.json"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = discover_spreadsheets(dir.path(), &["xlsx".to_string(), "xls".to_string()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.XLS", "b.xlsx"]);
    }

    #[test]
    fn test_unreadable_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        assert!(matches!(read_sheet(&path), Err(SheetError::Open { .. })));
    }
}
