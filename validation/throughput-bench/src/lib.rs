//! Concurrent throughput benchmark for two functionally equivalent HTTP endpoints.
//!
//! This crate provides tools to:
//! - Call an endpoint variant and validate its delay and element count
//! - Fire batches of calls through a bounded worker pool
//! - Sweep increasing load levels per variant after a warm-up phase
//! - Collect throughput into a sparse table and export it as delimited text

pub mod config;
pub mod endpoint;
pub mod error;
pub mod export;
pub mod generator;
pub mod metrics;
pub mod report;
pub mod results;
pub mod runner;
pub mod sweep;

pub use config::{BenchConfig, MeasurementConfig, VariantConfig, WarmupConfig};
pub use endpoint::{Endpoint, EndpointClient, MeasurementRequest};
pub use error::{BenchError, BenchResult, ErrorKind};
pub use export::DelimitedExporter;
pub use generator::{BatchOutcome, LoadGenerator};
pub use report::ResultsReport;
pub use results::{ResultTable, ThroughputTable};
pub use runner::{publish_results, run_benchmark, BenchmarkRun};
pub use sweep::{LevelSummary, SweepController, SweepReport, TrialSummary, WarmupSummary};
