use chrono::NaiveDateTime;
use std::fmt;

/// A single spreadsheet cell after ingestion. Date-like cells keep their
/// parsed value; everything downstream reads them through [`CellValue::render`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Error(String),
}

/// Coarse type of a column's cells, shown in the column statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Mixed,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            // Formula errors such as `#N/A` carry no value.
            CellValue::Empty | CellValue::Error(_) => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Canonical text form of the cell, `None` for empty cells.
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let text = match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => render_float(*f),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Empty | CellValue::Error(_) => return None,
        };
        Some(text)
    }

    pub fn kind(&self) -> CellKind {
        if self.is_empty() {
            return CellKind::Empty;
        }
        match self {
            CellValue::Text(_) => CellKind::Text,
            CellValue::Int(_) => CellKind::Integer,
            CellValue::Float(f) if f.fract() == 0.0 => CellKind::Integer,
            CellValue::Float(_) => CellKind::Float,
            CellValue::Bool(_) => CellKind::Boolean,
            CellValue::DateTime(_) => CellKind::DateTime,
            CellValue::Empty | CellValue::Error(_) => CellKind::Empty,
        }
    }
}

// Whole floats are how spreadsheets store most integers; print them without a fraction.
fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl CellKind {
    /// Folds the kind of one more cell into the kind seen so far for a column.
    pub fn merge(self, other: CellKind) -> CellKind {
        match (self, other) {
            (a, CellKind::Empty) => a,
            (CellKind::Empty, b) => b,
            (CellKind::Integer, CellKind::Float) | (CellKind::Float, CellKind::Integer) => {
                CellKind::Float
            }
            (a, b) if a == b => a,
            _ => CellKind::Mixed,
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CellKind::Empty => "empty",
            CellKind::Text => "text",
            CellKind::Integer => "integer",
            CellKind::Float => "float",
            CellKind::Boolean => "boolean",
            CellKind::DateTime => "datetime",
            CellKind::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

/// First worksheet of a workbook: a header of distinct column names and the
/// data rows beneath it.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

pub static EMPTY_CELL: CellValue = CellValue::Empty;

impl RawSheet {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (row, column); short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_render() {
        assert_eq!(CellValue::Empty.render(), None);
        assert_eq!(CellValue::Text(String::new()).render(), None);
        assert_eq!(CellValue::Float(f64::NAN).render(), None);
        assert_eq!(CellValue::Float(30.0).render().as_deref(), Some("30"));
        assert_eq!(CellValue::Float(30.5).render().as_deref(), Some("30.5"));
        assert_eq!(CellValue::Int(-4).render().as_deref(), Some("-4"));

        let dt = NaiveDate::from_ymd_opt(2025, 11, 15)
            .unwrap()
            .and_hms_opt(10, 25, 0)
            .unwrap();
        assert_eq!(
            CellValue::DateTime(dt).render().as_deref(),
            Some("2025-11-15 10:25:00")
        );
    }

    #[test]
    fn test_error_cells_are_empty() {
        let cell = CellValue::Error("#N/A".to_string());
        assert!(cell.is_empty());
        assert_eq!(cell.render(), None);
        assert_eq!(cell.kind(), CellKind::Empty);
    }

    #[test]
    fn test_kind_merge() {
        assert_eq!(CellKind::Empty.merge(CellKind::Text), CellKind::Text);
        assert_eq!(CellKind::Integer.merge(CellKind::Float), CellKind::Float);
        assert_eq!(CellKind::Text.merge(CellKind::Empty), CellKind::Text);
        assert_eq!(CellKind::Text.merge(CellKind::Integer), CellKind::Mixed);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let sheet = RawSheet {
            sheet_name: "Sheet1".to_string(),
            headers: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![CellValue::Int(1)]],
        };
        assert_eq!(sheet.cell(0, 0), &CellValue::Int(1));
        assert_eq!(sheet.cell(0, 1), &CellValue::Empty);
        assert_eq!(sheet.cell(5, 0), &CellValue::Empty);
    }
}
