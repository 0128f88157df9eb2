use std::fmt;

use crate::models::{FileAnalysis, GlobalSummary, ProcessingStats};
use crate::processor::{ISO_PATTERN, LOCALIZED_PATTERN, SchemaMapper, SchemaMapping};

/// Markdown data-inventory report. Rendered through `Display`, so
/// `report.to_string()` yields the whole document.
pub struct InventoryReport<'a> {
    pub generated_at: &'a str,
    pub summary: &'a GlobalSummary,
    pub analyses: &'a [FileAnalysis],
    pub mapper: &'a SchemaMapper,
    pub max_errors: usize,
}

/// Makes a value safe to place inside a Markdown table cell.
pub fn escape_cell(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

impl<'a> InventoryReport<'a> {
    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        writeln!(f, "## Executive Summary")?;
        writeln!(f)?;
        writeln!(f, "| Metric | Value |")?;
        writeln!(f, "| --- | --- |")?;
        writeln!(f, "| Files discovered | {} |", summary.total_files)?;
        writeln!(f, "| Files processed | {} |", self.analyses.len())?;
        writeln!(f, "| Files failed | {} |", summary.failed_files.len())?;
        writeln!(f, "| Total records | {} |", summary.total_records)?;
        writeln!(f, "| Parsed time slots | {} |", summary.parsed)?;
        writeln!(f, "| Time parse errors | {} |", summary.failed)?;
        writeln!(f, "| Success rate | {:.1}% |", summary.success_rate())?;
        writeln!(
            f,
            "| Date range | {} ~ {} |",
            or_dash(summary.first_date.as_deref()),
            or_dash(summary.last_date.as_deref())
        )?;
        let campuses = if summary.campuses.is_empty() {
            "-".to_string()
        } else {
            escape_cell(&summary.campuses.join(", "))
        };
        writeln!(f, "| Campuses | {} |", campuses)?;
        writeln!(f)?;

        if !summary.failed_files.is_empty() {
            writeln!(f, "### ❌ Files that could not be read")?;
            writeln!(f)?;
            for name in &summary.failed_files {
                writeln!(f, "- `{}`", name)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }

    fn write_file(&self, f: &mut fmt::Formatter<'_>, analysis: &FileAnalysis) -> fmt::Result {
        let icon = if analysis.has_errors() { "⚠️" } else { "✅" };
        writeln!(f, "## {} File: `{}`", icon, analysis.file_name)?;
        writeln!(f)?;
        writeln!(f, "- **Sheet:** {}", analysis.sheet_name)?;
        writeln!(f, "- **Row Count:** {}", analysis.row_count)?;
        writeln!(f)?;

        writeln!(f, "### Column Statistics")?;
        writeln!(f)?;
        if analysis.columns.is_empty() {
            writeln!(f, "_No column statistics available_")?;
        } else {
            writeln!(f, "| Column | Type | Non-null | Distinct | Samples |")?;
            writeln!(f, "| --- | --- | --- | --- | --- |")?;
            for column in &analysis.columns {
                let samples: Vec<String> = column.samples.iter().map(|s| escape_cell(s)).collect();
                writeln!(
                    f,
                    "| {} | {} | {:.1}% | {} | {} |",
                    escape_cell(&column.name),
                    column.kind,
                    column.non_null_pct,
                    column.distinct_values,
                    samples.join(", ")
                )?;
            }
        }
        writeln!(f)?;

        write_mapping(f, &analysis.mapping)?;

        writeln!(f, "### Data Preview (Top {} Rows)", analysis.sample_rows.len())?;
        writeln!(f)?;
        if analysis.sample_rows.is_empty() || analysis.columns.is_empty() {
            writeln!(f, "_No data extracted_")?;
        } else {
            let header: Vec<String> = analysis.columns.iter().map(|c| escape_cell(&c.name)).collect();
            writeln!(f, "| {} |", header.join(" | "))?;
            writeln!(f, "|{}", " --- |".repeat(header.len()))?;
            for row in &analysis.sample_rows {
                let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
                writeln!(f, "| {} |", cells.join(" | "))?;
            }
        }
        writeln!(f)?;

        write_stats(f, &analysis.stats)?;

        if analysis.has_errors() {
            writeln!(f, "### Validation Errors ({})", analysis.errors.len())?;
            writeln!(f)?;
            for error in analysis.errors.iter().take(self.max_errors) {
                writeln!(f, "- {}", escape_cell(error))?;
            }
            if analysis.errors.len() > self.max_errors {
                writeln!(f, "- ... and {} more", analysis.errors.len() - self.max_errors)?;
            }
        } else {
            writeln!(f, "- **Validation:** Passed")?;
        }
        writeln!(f)?;
        writeln!(f, "---")?;
        writeln!(f)
    }

    fn write_appendix(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Appendix")?;
        writeln!(f)?;
        writeln!(f, "### Column Aliases")?;
        writeln!(f)?;
        writeln!(f, "Aliases are tried in order; the first one present in the header wins.")?;
        writeln!(f)?;
        writeln!(f, "| Field | Aliases |")?;
        writeln!(f, "| --- | --- |")?;
        for (field, aliases) in self.mapper.table() {
            writeln!(f, "| `{}` | {} |", field, escape_cell(&aliases.join(", ")))?;
        }
        writeln!(f)?;

        writeln!(f, "### Time Grammars")?;
        writeln!(f)?;
        writeln!(f, "The localized grammar is tried first; the ISO grammar only when it does not match.")?;
        writeln!(f)?;
        writeln!(f, "1. Localized, e.g. `2025年11月15日(10:25-12:15)`: `{}`", LOCALIZED_PATTERN)?;
        writeln!(f, "2. ISO, e.g. `(2025-11-18) 13:30-15:20`: `{}`", ISO_PATTERN)?;
        writeln!(f)?;
        writeln!(f, "Times are interpreted in UTC+08:00.")
    }
}

fn write_mapping(f: &mut fmt::Formatter<'_>, mapping: &SchemaMapping) -> fmt::Result {
    writeln!(f, "### Field Mapping")?;
    writeln!(f)?;
    writeln!(f, "| Field | Status | Column | Aliases tried |")?;
    writeln!(f, "| --- | --- | --- | --- |")?;
    for field in mapping.iter() {
        let (status, column) = match &field.column {
            Some(column) => ("✅ mapped", escape_cell(column)),
            None => ("❌ not found", "-".to_string()),
        };
        writeln!(
            f,
            "| `{}` | {} | {} | {} |",
            field.field,
            status,
            column,
            escape_cell(&field.aliases_tried.join(", "))
        )?;
    }
    writeln!(f)
}

fn write_stats(f: &mut fmt::Formatter<'_>, stats: &ProcessingStats) -> fmt::Result {
    writeln!(f, "### Processing Statistics")?;
    writeln!(f)?;
    writeln!(f, "- **Parsed:** {}", stats.parsed)?;
    writeln!(f, "- **Failed:** {}", stats.failed)?;
    writeln!(
        f,
        "- **Date range:** {} ~ {} ({} distinct dates)",
        or_dash(stats.first_date.as_deref()),
        or_dash(stats.last_date.as_deref()),
        stats.unique_dates
    )?;
    writeln!(f, "- **Unique classes:** {}", stats.unique_classes)?;
    writeln!(f, "- **Unique courses:** {}", stats.unique_courses)?;
    match stats.mean_duration_minutes {
        Some(mean) => writeln!(f, "- **Mean duration:** {:.1} min", mean)?,
        None => writeln!(f, "- **Mean duration:** -")?,
    }
    if !stats.campus_distribution.is_empty() {
        let campuses: Vec<String> = stats
            .campus_distribution
            .iter()
            .map(|(campus, count)| format!("{} ({})", campus, count))
            .collect();
        writeln!(f, "- **Campus distribution:** {}", campuses.join(", "))?;
    }
    writeln!(f)
}

impl fmt::Display for InventoryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Data Inventory & Quality Report")?;
        writeln!(f)?;
        writeln!(f, "**Generated on:** {}", self.generated_at)?;
        writeln!(f)?;

        self.write_summary(f)?;
        for analysis in self.analyses {
            self.write_file(f, analysis)?;
        }
        self.write_appendix(f)
    }
}
