//! Error types for the benchmark driver.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;

/// Primary error type for benchmark operations.
#[derive(Debug, Error)]
pub enum BenchError {
    // === Transport Errors ===
    #[error("Transport error calling '{variant}': {source}")]
    Transport {
        variant: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "No pooled connection for '{variant}' within {waited_ms}ms (pool capacity {capacity})"
    )]
    PoolExhausted {
        variant: String,
        waited_ms: u64,
        capacity: usize,
    },

    #[error("'{variant}' responded with HTTP {status}")]
    HttpStatus { variant: String, status: u16 },

    #[error("Worker task failed: {0}")]
    Worker(String),

    // === Protocol Violations ===
    #[error(
        "Response returned abnormally fast from '{variant}': expected >={expected_ms}ms, observed {observed_ms}ms"
    )]
    TooFast {
        variant: String,
        expected_ms: u64,
        observed_ms: u64,
    },

    #[error("Wrong element count from '{variant}': expected {expected}, found {found}")]
    WrongElementCount {
        variant: String,
        expected: usize,
        found: usize,
    },

    #[error("Unparsable line {line_number} from '{variant}': {line:?}")]
    UnparsableLine {
        variant: String,
        line_number: usize,
        line: String,
    },

    // === Export Errors ===
    #[error("Unable to write results to {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to serialise report: {0}")]
    Report(#[from] serde_json::Error),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to read configuration {}: {message}", .path.display())]
    ConfigFile { path: PathBuf, message: String },

    // === Context ===
    #[error("Variant '{variant}' failed at load level {load_level}: {source}")]
    AtLoadLevel {
        variant: String,
        load_level: usize,
        #[source]
        source: Box<BenchError>,
    },
}

/// Coarse classification of a [`BenchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Export,
    Config,
}

impl BenchError {
    /// Classify this error, looking through any load-level context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BenchError::Transport { .. }
            | BenchError::PoolExhausted { .. }
            | BenchError::HttpStatus { .. }
            | BenchError::Worker(_) => ErrorKind::Transport,

            BenchError::TooFast { .. }
            | BenchError::WrongElementCount { .. }
            | BenchError::UnparsableLine { .. } => ErrorKind::Protocol,

            BenchError::Export { .. } | BenchError::Report(_) => ErrorKind::Export,

            BenchError::InvalidConfig(_) | BenchError::ConfigFile { .. } => ErrorKind::Config,

            BenchError::AtLoadLevel { source, .. } => source.kind(),
        }
    }

    /// Strip load-level context and return the underlying failure.
    pub fn root(&self) -> &BenchError {
        match self {
            BenchError::AtLoadLevel { source, .. } => source.root(),
            other => other,
        }
    }

    /// Attach the variant and load level at which this error surfaced.
    pub fn at_load_level(self, variant: impl Into<String>, load_level: usize) -> Self {
        BenchError::AtLoadLevel {
            variant: variant.into(),
            load_level,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_classified() {
        let err = BenchError::TooFast {
            variant: "blocking".to_string(),
            expected_ms: 1000,
            observed_ms: 812,
        };
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(
            err.to_string(),
            "Response returned abnormally fast from 'blocking': expected >=1000ms, observed 812ms"
        );
    }

    #[test]
    fn test_context_preserves_kind_and_root() {
        let err = BenchError::WrongElementCount {
            variant: "reactive".to_string(),
            expected: 10,
            found: 9,
        }
        .at_load_level("reactive", 512);

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(matches!(
            err.root(),
            BenchError::WrongElementCount { found: 9, .. }
        ));
        let message = err.to_string();
        assert!(message.contains("load level 512"));
        assert!(message.contains("expected 10, found 9"));
    }

    #[test]
    fn test_pool_exhausted_is_transport() {
        let err = BenchError::PoolExhausted {
            variant: "blocking".to_string(),
            waited_ms: 1000,
            capacity: 256,
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
