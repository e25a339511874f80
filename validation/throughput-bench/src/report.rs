//! Results reporting and formatting.

use std::path::Path;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Table};
use serde::Serialize;

use crate::error::{BenchError, BenchResult};
use crate::sweep::SweepReport;

/// Formats sweep results for output.
pub struct ResultsReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    #[serde(flatten)]
    report: &'a SweepReport,
}

impl ResultsReport {
    /// Throughput per load level, one column per variant.
    pub fn format_table(report: &SweepReport) -> String {
        let table = &report.table;
        let columns = table.column_names();

        let mut header = vec![Cell::new(table.row_index_name())];
        header.extend(columns.iter().map(|c| Cell::new(format!("{} (req/s)", c))));

        let mut out = Table::new();
        out.load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(header);

        for index in table.row_index() {
            let mut row = vec![index.to_string()];
            row.extend(columns.iter().map(|c| {
                table
                    .value(c, index)
                    .map(|v| format!("{:.1}", v))
                    .unwrap_or_else(|| "-".to_string())
            }));
            out.add_row(row);
        }

        out.to_string()
    }

    /// Latency detail for every measured level.
    pub fn format_latency_table(report: &SweepReport) -> String {
        let mut out = Table::new();
        out.load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                "Variant",
                "Requests",
                "Trials",
                "Req/s",
                "Latency (ms) mean / p50 / p99 / max",
            ]);

        for level in &report.levels {
            let latency = level
                .trials
                .last()
                .map(|t| {
                    format!(
                        "{:.1} / {:.1} / {:.1} / {:.1}",
                        level.mean_latency_ms, t.latency.p50_ms, t.latency.p99_ms, t.latency.max_ms
                    )
                })
                .unwrap_or_default();
            out.add_row(vec![
                level.variant.clone(),
                level.load_level.to_string(),
                level.trials.len().to_string(),
                format!("{:.1}", level.requests_per_second),
                latency,
            ]);
        }

        out.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(report: &SweepReport) -> BenchResult<String> {
        let doc = JsonReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            report,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Write the JSON summary to `path`.
    pub fn write_json(report: &SweepReport, path: &Path) -> BenchResult<()> {
        let json = Self::format_json(report)?;
        std::fs::write(path, json).map_err(|source| BenchError::Export {
            path: path.to_path_buf(),
            source,
        })
    }
}
