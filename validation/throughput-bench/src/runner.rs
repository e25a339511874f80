//! End-to-end run: sweep, then publish the results.

use std::io::Write;
use std::path::Path;

use tracing::{error, info, warn};

use crate::config::BenchConfig;
use crate::endpoint::Endpoint;
use crate::error::{BenchError, BenchResult};
use crate::export::DelimitedExporter;
use crate::report::ResultsReport;
use crate::sweep::{SweepController, SweepReport};

/// A completed sweep and whatever went wrong while publishing it.
#[derive(Debug)]
pub struct BenchmarkRun {
    pub report: SweepReport,
    /// Export failures in the order they were attempted.
    pub export_errors: Vec<BenchError>,
}

impl BenchmarkRun {
    pub fn is_exported(&self) -> bool {
        self.export_errors.is_empty()
    }
}

/// Run the sweep and publish its results.
///
/// A failed sweep returns its error and writes nothing. Once the sweep has
/// completed, export failures are collected on the returned run instead.
pub async fn run_benchmark<E, W>(
    controller: &SweepController<E>,
    summary_json: Option<&Path>,
    fallback: &mut W,
) -> BenchResult<BenchmarkRun>
where
    E: Endpoint + 'static,
    W: Write,
{
    let report = controller.run().await?;
    let export_errors = publish_results(&report, controller.config(), summary_json, fallback);
    Ok(BenchmarkRun {
        report,
        export_errors,
    })
}

/// Write the delimited table to `config.output`, then the optional JSON summary.
///
/// When the table cannot be written it is rendered to `fallback` instead. A
/// JSON failure never prevents the table from being written.
pub fn publish_results<W: Write>(
    report: &SweepReport,
    config: &BenchConfig,
    summary_json: Option<&Path>,
    fallback: &mut W,
) -> Vec<BenchError> {
    let mut errors = Vec::new();

    let exporter = DelimitedExporter::new(&config.output, config.delimiter_char());
    if let Err(e) = exporter.export(&report.table) {
        error!(error = %e, "Export failed, writing results to fallback output");
        let rendered = exporter.render(&report.table);
        if let Err(io) = fallback.write_all(rendered.as_bytes()).and_then(|_| fallback.flush()) {
            warn!(error = %io, "Fallback output failed");
        }
        errors.push(e);
    }

    if let Some(path) = summary_json {
        match ResultsReport::write_json(report, path) {
            Ok(()) => info!(path = %path.display(), "JSON summary written"),
            Err(e) => {
                error!(error = %e, "JSON summary failed");
                errors.push(e);
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::results::ThroughputTable;

    fn report() -> SweepReport {
        let mut table = ThroughputTable::new(4, "requests");
        table.add_measurement("blocking", 4, 40.0);
        table.add_measurement("reactive", 4, 80.5);
        SweepReport {
            table,
            levels: Vec::new(),
            warmup: Vec::new(),
        }
    }

    #[test]
    fn test_publish_writes_table_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchConfig {
            output: dir.path().join("out").join("benchmark.csv"),
            ..BenchConfig::default()
        };
        let summary = dir.path().join("summary.json");
        let mut fallback: Vec<u8> = Vec::new();

        let errors = publish_results(&report(), &config, Some(summary.as_path()), &mut fallback);

        assert!(errors.is_empty());
        assert!(fallback.is_empty());
        assert_eq!(
            std::fs::read_to_string(&config.output).unwrap(),
            "requests;blocking;reactive\n4;40;80.5\n"
        );
        assert!(std::fs::read_to_string(&summary).unwrap().contains("\"timestamp\""));
    }

    #[test]
    fn test_unwritable_table_goes_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchConfig {
            output: dir.path().to_path_buf(),
            ..BenchConfig::default()
        };
        let mut fallback: Vec<u8> = Vec::new();

        let errors = publish_results(&report(), &config, None, &mut fallback);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Export);
        assert_eq!(
            String::from_utf8(fallback).unwrap(),
            "requests;blocking;reactive\n4;40;80.5\n"
        );
    }

    #[test]
    fn test_summary_failure_still_writes_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchConfig {
            output: dir.path().join("benchmark.csv"),
            ..BenchConfig::default()
        };
        let summary = dir.path().join("missing").join("summary.json");
        let mut fallback: Vec<u8> = Vec::new();

        let errors = publish_results(&report(), &config, Some(summary.as_path()), &mut fallback);

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], BenchError::Export { .. }));
        assert!(config.output.exists());
        assert!(fallback.is_empty());
    }
}
