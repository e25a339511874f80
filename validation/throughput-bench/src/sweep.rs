//! Warm-up and measurement sweep over every (variant, load level) pair.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{BenchConfig, VariantConfig};
use crate::endpoint::{Endpoint, MeasurementRequest};
use crate::error::BenchResult;
use crate::generator::{BatchOutcome, LoadGenerator};
use crate::metrics::{mean, LatencyStats};
use crate::results::ThroughputTable;

/// Warm-up outcome for one variant. Failures are counted, never fatal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmupSummary {
    pub variant: String,
    pub succeeded: usize,
    pub failed: usize,
}

/// One timed batch at a given load level.
#[derive(Debug, Clone, Serialize)]
pub struct TrialSummary {
    pub duration_ms: f64,
    pub requests_per_second: f64,
    pub latency: LatencyStats,
}

impl From<&BatchOutcome> for TrialSummary {
    fn from(outcome: &BatchOutcome) -> Self {
        Self {
            duration_ms: outcome.duration.as_secs_f64() * 1000.0,
            requests_per_second: outcome.requests_per_second(),
            latency: outcome.latency,
        }
    }
}

/// All trials for one (variant, load level) cell.
#[derive(Debug, Clone, Serialize)]
pub struct LevelSummary {
    pub variant: String,
    pub load_level: usize,
    pub parallelism: usize,
    /// Mean over trials; this is the value stored in the table.
    pub requests_per_second: f64,
    /// Mean per-call latency averaged over trials.
    pub mean_latency_ms: f64,
    pub trials: Vec<TrialSummary>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub table: ThroughputTable,
    pub levels: Vec<LevelSummary>,
    pub warmup: Vec<WarmupSummary>,
}

/// Drives warm-up then the measurement sweep against an [`Endpoint`].
pub struct SweepController<E> {
    endpoint: Arc<E>,
    config: BenchConfig,
    generator: LoadGenerator,
    show_progress: bool,
}

impl<E: Endpoint + 'static> SweepController<E> {
    pub fn new(endpoint: Arc<E>, config: BenchConfig) -> Self {
        let generator = LoadGenerator::new(config.parallelism);
        Self {
            endpoint,
            config,
            generator,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr during the sweep.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Warm-up followed by the full sweep.
    pub async fn run(&self) -> BenchResult<SweepReport> {
        let warmup = self.warm_up().await;
        let mut report = self.measure().await?;
        report.warmup = warmup;
        Ok(report)
    }

    /// Issue untimed sequential calls per variant, discarding results.
    pub async fn warm_up(&self) -> Vec<WarmupSummary> {
        let warmup = &self.config.warmup;
        let mut summaries = Vec::with_capacity(self.config.variants.len());

        for variant in &self.config.variants {
            let request =
                MeasurementRequest::new(&variant.name, warmup.number_count, warmup.delay_millis);
            let mut summary = WarmupSummary {
                variant: variant.name.clone(),
                ..WarmupSummary::default()
            };

            for _ in 0..warmup.iterations {
                match self.endpoint.call(&request).await {
                    Ok(_) => summary.succeeded += 1,
                    Err(e) => {
                        summary.failed += 1;
                        warn!(variant = %variant.name, error = %e, "Warm-up call failed");
                    }
                }
            }

            if warmup.iterations > 0 {
                info!(
                    variant = %variant.name,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "Warm-up complete"
                );
            }
            summaries.push(summary);
        }
        summaries
    }

    /// Run every load level for every variant, strictly one batch at a time.
    ///
    /// The first failing level aborts the sweep.
    pub async fn measure(&self) -> BenchResult<SweepReport> {
        let load_levels = self.config.load_levels();
        let iterations = self.config.measurement.iterations.max(1);
        let total = (self.config.variants.len() * load_levels.len() * iterations) as u64;
        let pb = self.progress_bar(total);

        let mut table =
            ThroughputTable::new(self.config.parallelism, self.config.row_index_name.clone());
        let mut levels = Vec::with_capacity(self.config.variants.len() * load_levels.len());

        for variant in &self.config.variants {
            pb.set_message(variant.name.clone());
            for &load_level in &load_levels {
                let summary = match self.measure_level(variant, load_level, &pb).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        pb.abandon_with_message(format!("{} failed", variant.name));
                        return Err(e.at_load_level(&variant.name, load_level));
                    }
                };

                info!(
                    variant = %variant.name,
                    parallelism = summary.parallelism,
                    request_count = load_level,
                    requests_per_second = summary.requests_per_second,
                    mean_latency_ms = summary.mean_latency_ms,
                    "Measurement complete"
                );
                table.add_measurement(&variant.name, load_level, summary.requests_per_second);
                levels.push(summary);
            }
        }

        pb.finish_with_message("Complete!");

        Ok(SweepReport {
            table,
            levels,
            warmup: Vec::new(),
        })
    }

    async fn measure_level(
        &self,
        variant: &VariantConfig,
        load_level: usize,
        pb: &ProgressBar,
    ) -> BenchResult<LevelSummary> {
        let measurement = &self.config.measurement;
        let request = Arc::new(MeasurementRequest::new(
            &variant.name,
            measurement.number_count,
            measurement.delay_millis,
        ));

        let mut trials = Vec::with_capacity(measurement.iterations.max(1));
        for _ in 0..measurement.iterations.max(1) {
            let endpoint = Arc::clone(&self.endpoint);
            let request = Arc::clone(&request);
            let outcome = self
                .generator
                .run_batch(load_level, move || {
                    let endpoint = Arc::clone(&endpoint);
                    let request = Arc::clone(&request);
                    async move { endpoint.call(&request).await }
                })
                .await?;
            trials.push(TrialSummary::from(&outcome));
            pb.inc(1);
        }

        let rps: Vec<f64> = trials.iter().map(|t| t.requests_per_second).collect();
        let latencies: Vec<f64> = trials.iter().map(|t| t.latency.mean_ms).collect();

        Ok(LevelSummary {
            variant: variant.name.clone(),
            load_level,
            parallelism: self.generator.parallelism(),
            requests_per_second: mean(&rps).unwrap_or_default(),
            mean_latency_ms: mean(&latencies).unwrap_or_default(),
            trials,
        })
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} batches {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb
    }
}
