use anyhow::Result;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{CanonicalField, CellValue, EMPTY_CELL, ExamRecord, ProcessingStats};
use crate::processor::{FieldCleaner, SchemaMapping, TimeParseError, TimeParser};

/// Turns one spreadsheet row into an [`ExamRecord`].
pub struct RecordBuilder {
    cleaner: FieldCleaner,
    parser: TimeParser,
}

impl RecordBuilder {
    pub fn new() -> Result<Self> {
        Ok(RecordBuilder {
            cleaner: FieldCleaner,
            parser: TimeParser::new()?,
        })
    }

    /// Builds the record for the row displayed at `row_position`. Time parse
    /// failures are returned next to the record rather than raised.
    pub fn build_record(
        &self,
        file_name: &str,
        row_position: usize,
        mapping: &SchemaMapping,
        row: &[CellValue],
    ) -> (ExamRecord, Option<TimeParseError>) {
        let mut record = ExamRecord::new(file_name, row_position);

        for field in CanonicalField::ALL {
            let cell = mapping
                .column_index(field)
                .and_then(|idx| row.get(idx))
                .unwrap_or(&EMPTY_CELL);

            if field.is_count() {
                record.count = self.cleaner.clean_count(cell);
            } else {
                record.set_text(field, self.cleaner.clean_text(cell));
            }
        }

        match self.parser.parse(&record.raw_time) {
            Ok(slot) => {
                record.start_timestamp = Some(slot.start_timestamp());
                record.end_timestamp = Some(slot.end_timestamp());
                record.date = Some(slot.date_string());
                record.duration_minutes = slot.duration_minutes;
                (record, None)
            }
            Err(e) => {
                record.parse_error = Some(e.to_string());
                (record, Some(e))
            }
        }
    }
}

/// Running totals over the records of one file.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    parsed: usize,
    failed: usize,
    campus_counts: HashMap<String, usize>,
    dates: BTreeSet<String>,
    classes: HashSet<String>,
    courses: HashSet<String>,
    duration_total: i64,
    duration_count: usize,
}

impl StatsAccumulator {
    pub fn observe(&mut self, record: &ExamRecord) {
        if !record.campus.is_empty() {
            *self.campus_counts.entry(record.campus.clone()).or_insert(0) += 1;
        }
        if !record.class_name.is_empty() {
            self.classes.insert(record.class_name.clone());
        }
        if !record.course_name.is_empty() {
            self.courses.insert(record.course_name.clone());
        }

        if !record.is_parsed() {
            self.failed += 1;
            return;
        }

        self.parsed += 1;
        if let Some(date) = &record.date {
            self.dates.insert(date.clone());
        }
        if record.duration_minutes > 0 {
            self.duration_total += record.duration_minutes;
            self.duration_count += 1;
        }
    }

    pub fn finish(self) -> ProcessingStats {
        let mut campus_distribution: Vec<(String, usize)> = self.campus_counts.into_iter().collect();
        campus_distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mean_duration_minutes = if self.duration_count > 0 {
            Some(self.duration_total as f64 / self.duration_count as f64)
        } else {
            None
        };

        ProcessingStats {
            parsed: self.parsed,
            failed: self.failed,
            campus_distribution,
            first_date: self.dates.first().cloned(),
            last_date: self.dates.last().cloned(),
            unique_dates: self.dates.len(),
            unique_classes: self.classes.len(),
            unique_courses: self.courses.len(),
            mean_duration_minutes,
        }
    }
}
