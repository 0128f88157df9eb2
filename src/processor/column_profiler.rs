use anyhow::Result;
use polars::prelude::*;
use std::collections::HashSet;

use crate::models::{CellKind, ColumnProfile, RawSheet};

/// Computes raw per-column statistics for the inventory report.
pub struct ColumnProfiler {
    sample_size: usize,
}

impl ColumnProfiler {
    pub fn new(sample_size: usize) -> Self {
        ColumnProfiler { sample_size }
    }

    pub fn profile(&self, sheet: &RawSheet) -> Result<Vec<ColumnProfile>> {
        let df = self.sheet_to_dataframe(sheet)?;
        let height = df.height();
        let mut profiles = Vec::with_capacity(df.width());

        for (idx, column) in df.get_columns().iter().enumerate() {
            let series = column.as_materialized_series();
            let present = series.drop_nulls();

            let non_null_pct = if height == 0 {
                0.0
            } else {
                (height - series.null_count()) as f64 * 100.0 / height as f64
            };

            let mut seen = HashSet::new();
            let samples: Vec<String> = present
                .str()?
                .into_no_null_iter()
                .filter(|value| seen.insert(*value))
                .take(self.sample_size)
                .map(|value| value.to_string())
                .collect();

            let kind = sheet
                .rows
                .iter()
                .map(|row| row.get(idx).map(|cell| cell.kind()).unwrap_or(CellKind::Empty))
                .fold(CellKind::Empty, CellKind::merge);

            profiles.push(ColumnProfile {
                name: series.name().to_string(),
                non_null_pct,
                distinct_values: present.n_unique()?,
                samples,
                kind,
            });
        }

        Ok(profiles)
    }

    /// One string column per header; empty cells become nulls.
    fn sheet_to_dataframe(&self, sheet: &RawSheet) -> Result<DataFrame> {
        let columns: Vec<Column> = sheet
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<Option<String>> = (0..sheet.height())
                    .map(|row| sheet.cell(row, idx).render())
                    .collect();
                Series::new(name.as_str().into(), values).into()
            })
            .collect();

        Ok(DataFrame::new(columns)?)
    }
}

impl Default for ColumnProfiler {
    fn default() -> Self {
        Self::new(3)
    }
}
