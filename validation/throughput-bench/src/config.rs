//! Configuration loading and management.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// Main benchmark configuration, loadable from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Worker pool size for every batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Connection pool ceiling; must be at least `parallelism`. Follows
    /// `parallelism` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
    #[serde(default = "default_pending_acquire_timeout_ms")]
    pub pending_acquire_timeout_ms: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "WarmupConfig::default")]
    pub warmup: WarmupConfig,
    #[serde(default = "MeasurementConfig::default")]
    pub measurement: MeasurementConfig,
    /// Applied to `parallelism` to produce the load levels.
    #[serde(default = "default_multipliers")]
    pub multipliers: Vec<usize>,
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantConfig>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_row_index_name")]
    pub row_index_name: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// Untimed calls issued before the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmupConfig {
    #[serde(default = "default_warmup_iterations")]
    pub iterations: usize,
    #[serde(default = "default_number_count")]
    pub number_count: u32,
    #[serde(default = "default_warmup_delay_millis")]
    pub delay_millis: u64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            iterations: default_warmup_iterations(),
            number_count: default_number_count(),
            delay_millis: default_warmup_delay_millis(),
        }
    }
}

/// Per-call parameters and trial count for timed batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    #[serde(default = "default_measurement_iterations")]
    pub iterations: usize,
    #[serde(default = "default_number_count")]
    pub number_count: u32,
    #[serde(default = "default_measurement_delay_millis")]
    pub delay_millis: u64,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            iterations: default_measurement_iterations(),
            number_count: default_number_count(),
            delay_millis: default_measurement_delay_millis(),
        }
    }
}

/// An endpoint variant under comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    /// Defaults to `/{name}`.
    #[serde(default)]
    pub path: Option<String>,
}

impl VariantConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    /// Path appended to the base URL, always with a leading slash.
    pub fn path(&self) -> String {
        match &self.path {
            Some(p) if p.starts_with('/') => p.clone(),
            Some(p) => format!("/{}", p),
            None => format!("/{}", self.name),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_parallelism() -> usize {
    256
}

fn default_pending_acquire_timeout_ms() -> u64 {
    1000
}

fn default_warmup_iterations() -> usize {
    100
}

fn default_measurement_iterations() -> usize {
    1
}

fn default_number_count() -> u32 {
    10
}

fn default_warmup_delay_millis() -> u64 {
    1
}

fn default_measurement_delay_millis() -> u64 {
    1000
}

fn default_multipliers() -> Vec<usize> {
    vec![1, 2, 4, 8, 16, 32, 64, 128]
}

fn default_variants() -> Vec<VariantConfig> {
    vec![VariantConfig::new("blocking"), VariantConfig::new("reactive")]
}

fn default_output() -> PathBuf {
    PathBuf::from("benchmark.csv")
}

fn default_row_index_name() -> String {
    "requests".to_string()
}

fn default_delimiter() -> String {
    ";".to_string()
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            parallelism: default_parallelism(),
            max_connections: None,
            pending_acquire_timeout_ms: default_pending_acquire_timeout_ms(),
            request_timeout_secs: None,
            warmup: WarmupConfig::default(),
            measurement: MeasurementConfig::default(),
            multipliers: default_multipliers(),
            variants: default_variants(),
            output: default_output(),
            row_index_name: default_row_index_name(),
            delimiter: default_delimiter(),
        }
    }
}

impl BenchConfig {
    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            BenchError::InvalidConfig(message) => BenchError::ConfigFile {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from a YAML document. Missing keys take their defaults.
    pub fn from_yaml(content: &str) -> BenchResult<Self> {
        serde_yaml::from_str(content).map_err(|e| BenchError::InvalidConfig(e.to_string()))
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> BenchResult<String> {
        serde_yaml::to_string(self).map_err(|e| BenchError::InvalidConfig(e.to_string()))
    }

    /// Validate configuration.
    pub fn validate(&self) -> BenchResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url must not be empty"));
        }
        if self.parallelism == 0 {
            return Err(invalid("parallelism must be > 0"));
        }
        if self.connection_capacity() < self.parallelism {
            return Err(invalid(format!(
                "max_connections ({}) must be >= parallelism ({})",
                self.connection_capacity(),
                self.parallelism
            )));
        }
        if self.measurement.iterations == 0 {
            return Err(invalid("measurement.iterations must be >= 1"));
        }
        if self.multipliers.is_empty() {
            return Err(invalid("at least one multiplier must be specified"));
        }
        if self.multipliers.contains(&0) {
            return Err(invalid("multipliers must be >= 1"));
        }
        if self.variants.is_empty() {
            return Err(invalid("at least one variant must be specified"));
        }
        let mut seen = BTreeSet::new();
        for variant in &self.variants {
            if variant.name.trim().is_empty() {
                return Err(invalid("variant names must not be empty"));
            }
            if !seen.insert(variant.name.as_str()) {
                return Err(invalid(format!("duplicate variant '{}'", variant.name)));
            }
        }
        if self.delimiter.chars().count() != 1 {
            return Err(invalid(format!(
                "delimiter must be a single character, got {:?}",
                self.delimiter
            )));
        }
        let delimiter = self.delimiter_char();
        if self.row_index_name.contains(delimiter) {
            return Err(invalid(format!(
                "row_index_name {:?} contains the delimiter {:?}",
                self.row_index_name, delimiter
            )));
        }
        if let Some(variant) = self.variants.iter().find(|v| v.name.contains(delimiter)) {
            return Err(invalid(format!(
                "variant '{}' contains the delimiter {:?}",
                variant.name, delimiter
            )));
        }
        Ok(())
    }

    /// Request counts per batch, ascending and de-duplicated.
    pub fn load_levels(&self) -> Vec<usize> {
        let levels: BTreeSet<usize> = self
            .multipliers
            .iter()
            .map(|m| m.saturating_mul(self.parallelism))
            .collect();
        levels.into_iter().collect()
    }

    /// Effective connection pool ceiling.
    pub fn connection_capacity(&self) -> usize {
        self.max_connections.unwrap_or(self.parallelism)
    }

    pub fn pending_acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.pending_acquire_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn delimiter_char(&self) -> char {
        self.delimiter.chars().next().unwrap_or(';')
    }
}

fn invalid(message: impl Into<String>) -> BenchError {
    BenchError::InvalidConfig(message.into())
}
