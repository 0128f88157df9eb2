use std::collections::BTreeSet;

use crate::models::{CellKind, ExamRecord};
use crate::processor::SchemaMapping;

/// Raw statistics for one physical column of a spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub non_null_pct: f64,
    pub distinct_values: usize,
    pub samples: Vec<String>,
    pub kind: CellKind,
}

/// Per-file processing statistics derived from the built records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub parsed: usize,
    pub failed: usize,
    /// Campus name and row count, most frequent first.
    pub campus_distribution: Vec<(String, usize)>,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub unique_dates: usize,
    pub unique_classes: usize,
    pub unique_courses: usize,
    /// Mean over parsed records with a positive duration.
    pub mean_duration_minutes: Option<f64>,
}

/// Everything learned from a single spreadsheet. Built once, then only read.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub file_name: String,
    pub sheet_name: String,
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub mapping: SchemaMapping,
    pub sample_rows: Vec<Vec<String>>,
    pub records: Vec<ExamRecord>,
    pub errors: Vec<String>,
    pub stats: ProcessingStats,
}

impl FileAnalysis {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Totals across every file in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalSummary {
    pub total_files: usize,
    pub failed_files: Vec<String>,
    pub total_records: usize,
    pub parsed: usize,
    pub failed: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub campuses: Vec<String>,
}

impl GlobalSummary {
    pub fn from_analyses(analyses: &[FileAnalysis], failed_files: &[String]) -> Self {
        let mut campuses = BTreeSet::new();
        let mut summary = GlobalSummary {
            total_files: analyses.len() + failed_files.len(),
            failed_files: failed_files.to_vec(),
            ..Default::default()
        };

        for analysis in analyses {
            summary.total_records += analysis.records.len();
            summary.parsed += analysis.stats.parsed;
            summary.failed += analysis.stats.failed;
            summary.first_date = min_date(summary.first_date.take(), analysis.stats.first_date.clone());
            summary.last_date = max_date(summary.last_date.take(), analysis.stats.last_date.clone());
            campuses.extend(
                analysis
                    .stats
                    .campus_distribution
                    .iter()
                    .map(|(campus, _)| campus.clone()),
            );
        }

        summary.campuses = campuses.into_iter().collect();
        summary
    }

    /// Share of records whose time text parsed, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.parsed as f64 * 100.0 / self.total_records as f64
        }
    }
}

// ISO dates order lexically.
fn min_date(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_date(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(name: &str, parsed: usize, failed: usize, dates: (&str, &str), campus: &str) -> FileAnalysis {
        FileAnalysis {
            file_name: name.to_string(),
            sheet_name: "Sheet1".to_string(),
            row_count: parsed + failed,
            columns: Vec::new(),
            mapping: SchemaMapping::default(),
            sample_rows: Vec::new(),
            records: (0..parsed + failed).map(|i| ExamRecord::new(name, i + 2)).collect(),
            errors: Vec::new(),
            stats: ProcessingStats {
                parsed,
                failed,
                campus_distribution: vec![(campus.to_string(), parsed + failed)],
                first_date: Some(dates.0.to_string()),
                last_date: Some(dates.1.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_global_summary_folds_files() {
        let analyses = vec![
            analysis("a.xlsx", 8, 2, ("2025-12-20", "2026-01-05"), "仙林"),
            analysis("b.xlsx", 5, 0, ("2025-12-15", "2025-12-30"), "三牌楼"),
        ];
        let summary = GlobalSummary::from_analyses(&analyses, &["broken.xlsx".to_string()]);

        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.total_records, 15);
        assert_eq!(summary.parsed, 13);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.first_date.as_deref(), Some("2025-12-15"));
        assert_eq!(summary.last_date.as_deref(), Some("2026-01-05"));
        assert_eq!(summary.campuses.len(), 2);
        assert!((summary.success_rate() - 86.666).abs() < 0.01);
    }

    #[test]
    fn test_empty_summary() {
        let summary = GlobalSummary::from_analyses(&[], &[]);
        assert_eq!(summary.success_rate(), 0.0);
        assert!(summary.first_date.is_none());
    }
}
