use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::ProcessingConfig;
use crate::models::{FileAnalysis, RawSheet};
use crate::processor::{ColumnProfiler, RecordBuilder, SchemaMapper, StatsAccumulator};

/// Runs one spreadsheet through mapping, record building and profiling.
pub struct FileAnalyzer {
    mapper: SchemaMapper,
    builder: RecordBuilder,
    profiler: ColumnProfiler,
    header_offset: usize,
    sample_rows: usize,
}

impl FileAnalyzer {
    pub fn new(mapper: SchemaMapper, options: &ProcessingConfig) -> Result<Self> {
        Ok(FileAnalyzer {
            mapper,
            builder: RecordBuilder::new()?,
            profiler: ColumnProfiler::new(options.sample_rows),
            header_offset: options.header_offset,
            sample_rows: options.sample_rows,
        })
    }

    pub fn mapper(&self) -> &SchemaMapper {
        &self.mapper
    }

    pub fn analyze(&self, file_name: &str, sheet: &RawSheet) -> FileAnalysis {
        let mapping = self.mapper.resolve(&sheet.headers);
        info!(
            "{}: {} rows, {}/{} fields mapped",
            file_name,
            sheet.height(),
            mapping.mapped_count(),
            mapping.iter().count()
        );
        for field in mapping.unmapped() {
            debug!("{}: no column found for {}", file_name, field);
        }

        let mut records = Vec::with_capacity(sheet.height());
        let mut errors = Vec::new();
        let mut acc = StatsAccumulator::default();

        for (idx, row) in sheet.rows.iter().enumerate() {
            let position = idx + self.header_offset;
            let (record, error) = self.builder.build_record(file_name, position, &mapping, row);

            if let Some(error) = error {
                let message = format!("Row {}: {} (Raw: '{}')", position, error, record.raw_time);
                debug!("{}: {}", file_name, message);
                errors.push(message);
            }
            acc.observe(&record);
            records.push(record);
        }

        let columns = self.profiler.profile(sheet).unwrap_or_else(|e| {
            warn!("{}: column profiling failed: {}", file_name, e);
            Vec::new()
        });

        let sample_rows = sheet
            .rows
            .iter()
            .take(self.sample_rows)
            .map(|row| {
                (0..sheet.headers.len())
                    .map(|col| row.get(col).and_then(|cell| cell.render()).unwrap_or_default())
                    .collect()
            })
            .collect();

        let stats = acc.finish();
        info!(
            "{}: {} parsed, {} with time errors",
            file_name, stats.parsed, stats.failed
        );

        FileAnalysis {
            file_name: file_name.to_string(),
            sheet_name: sheet.sheet_name.clone(),
            row_count: sheet.height(),
            columns,
            mapping,
            sample_rows,
            records,
            errors,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sheet() -> RawSheet {
        RawSheet {
            sheet_name: "学生考试安排".to_string(),
            headers: ["校区", "课程", "课程名称", "行政班级", "考试时间", "考试人数"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows: vec![
                vec![
                    text("仙林"),
                    text("物理"),
                    text("大学物理"),
                    text("B240402"),
                    text("2025年11月15日(10:25-12:15)"),
                    CellValue::Float(60.0),
                ],
                vec![
                    text("仙林"),
                    text("数学"),
                    text("高等数学"),
                    text("B240401"),
                    text("(2025-11-18) 13:30-15:20"),
                    text("约30人"),
                ],
                vec![text("三牌楼"), text("英语"), text("大学英语"), text("B240403"), CellValue::Empty],
                vec![text("三牌楼"), text("化学"), text("普通化学"), text("B240403"), text("另行通知")],
            ],
        }
    }

    #[test]
    fn test_analyze_file() {
        let analyzer = FileAnalyzer::new(SchemaMapper::new(), &ProcessingConfig::default()).unwrap();
        let analysis = analyzer.analyze("students.xlsx", &sheet());

        assert_eq!(analysis.row_count, 4);
        assert_eq!(analysis.records.len(), 4);
        assert_eq!(analysis.records[0].id, "students.xlsx-2");
        assert_eq!(analysis.records[3].id, "students.xlsx-5");
        assert_eq!(analysis.records[0].course_name, "大学物理");
        assert_eq!(analysis.records[1].count, 0);
        assert_eq!(analysis.records[1].duration_minutes, 110);

        assert_eq!(
            analysis.errors,
            vec![
                "Row 4: Missing time data (Raw: '')".to_string(),
                "Row 5: Unrecognized date format (Raw: '另行通知')".to_string(),
            ]
        );
        assert_eq!(analysis.stats.parsed, 2);
        assert_eq!(analysis.stats.failed, 2);
        assert_eq!(analysis.stats.unique_classes, 3);
        assert_eq!(analysis.stats.mean_duration_minutes, Some(110.0));

        assert_eq!(analysis.columns.len(), 6);
        assert_eq!(analysis.sample_rows.len(), 3);
        assert_eq!(analysis.sample_rows[2][5], "");
        assert_eq!(analysis.mapping.mapped_count(), 5);
    }

    #[test]
    fn test_header_offset() {
        let options = ProcessingConfig {
            header_offset: 3,
            ..ProcessingConfig::default()
        };
        let analyzer = FileAnalyzer::new(SchemaMapper::new(), &options).unwrap();
        let analysis = analyzer.analyze("x.xlsx", &sheet());
        assert_eq!(analysis.records[0].row_index, 3);
    }
}
