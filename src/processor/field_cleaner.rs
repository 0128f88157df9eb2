use crate::models::CellValue;

/// Converts raw cells into the scalar types stored on a record. Never fails:
/// bad input becomes an empty string or zero.
pub struct FieldCleaner;

impl FieldCleaner {
    pub fn clean_text(&self, cell: &CellValue) -> String {
        match cell.render() {
            Some(text) => text.replace('\u{a0}', " ").trim().to_string(),
            None => String::new(),
        }
    }

    pub fn clean_count(&self, cell: &CellValue) -> i64 {
        match cell {
            CellValue::Int(i) => *i,
            CellValue::Float(f) if f.is_finite() => f.trunc() as i64,
            CellValue::Bool(b) => i64::from(*b),
            CellValue::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_cleaning() {
        let cleaner = FieldCleaner;

        assert_eq!(cleaner.clean_text(&CellValue::Empty), "");
        assert_eq!(cleaner.clean_text(&CellValue::Text("  教2-201 ".to_string())), "教2-201");
        assert_eq!(cleaner.clean_text(&CellValue::Text("仙林\u{a0}校区\u{a0}".to_string())), "仙林 校区");
        assert_eq!(cleaner.clean_text(&CellValue::Float(240402.0)), "240402");
        assert_eq!(cleaner.clean_text(&CellValue::Float(f64::NAN)), "");
    }

    #[test]
    fn test_count_cleaning() {
        let cleaner = FieldCleaner;

        assert_eq!(cleaner.clean_count(&CellValue::Int(45)), 45);
        assert_eq!(cleaner.clean_count(&CellValue::Float(30.0)), 30);
        assert_eq!(cleaner.clean_count(&CellValue::Text(" 28 ".to_string())), 28);
        assert_eq!(cleaner.clean_count(&CellValue::Text("约30人".to_string())), 0);
        assert_eq!(cleaner.clean_count(&CellValue::Text(String::new())), 0);
        assert_eq!(cleaner.clean_count(&CellValue::Float(f64::NAN)), 0);
        assert_eq!(cleaner.clean_count(&CellValue::Empty), 0);
    }
}
