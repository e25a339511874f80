//! HTTP client for the endpoint variants under test.
//!
//! Every variant honours the same contract: `GET {base}/{variant}?numberCount=n&delayMillis=d`
//! answers, no sooner than `d` milliseconds, with `n` integers separated by newlines.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};

/// Parameters for a single call. Built per call, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementRequest {
    pub variant: String,
    pub number_count: u32,
    pub delay_millis: u64,
}

impl MeasurementRequest {
    pub fn new(variant: impl Into<String>, number_count: u32, delay_millis: u64) -> Self {
        Self {
            variant: variant.into(),
            number_count,
            delay_millis,
        }
    }
}

/// Something that can serve a [`MeasurementRequest`] and report its latency.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Issue one call. Returns the elapsed time once the response has been validated.
    async fn call(&self, request: &MeasurementRequest) -> BenchResult<Duration>;
}

/// reqwest-backed [`Endpoint`] with an explicit connection ceiling.
pub struct EndpointClient {
    client: reqwest::Client,
    base_url: String,
    paths: BTreeMap<String, String>,
    connections: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl EndpointClient {
    /// Create a client sized for the configured connection capacity.
    pub fn new(config: &BenchConfig) -> BenchResult<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(config.connection_capacity())
            .tcp_nodelay(true);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            BenchError::InvalidConfig(format!("failed to create HTTP client: {}", e))
        })?;

        let paths = config
            .variants
            .iter()
            .map(|v| (v.name.clone(), v.path()))
            .collect();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            paths,
            connections: Arc::new(Semaphore::new(config.connection_capacity())),
            capacity: config.connection_capacity(),
            acquire_timeout: config.pending_acquire_timeout(),
        })
    }

    /// Full URL (without query) for `variant`.
    pub fn url_for(&self, variant: &str) -> String {
        match self.paths.get(variant) {
            Some(path) => format!("{}{}", self.base_url, path),
            None => format!("{}/{}", self.base_url, variant),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    async fn acquire_connection(&self, variant: &str) -> BenchResult<SemaphorePermit<'_>> {
        match tokio::time::timeout(self.acquire_timeout, self.connections.acquire()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(BenchError::Worker("connection pool closed".to_string())),
            Err(_) => Err(BenchError::PoolExhausted {
                variant: variant.to_string(),
                waited_ms: self.acquire_timeout.as_millis() as u64,
                capacity: self.capacity,
            }),
        }
    }
}

#[async_trait]
impl Endpoint for EndpointClient {
    async fn call(&self, request: &MeasurementRequest) -> BenchResult<Duration> {
        let url = self.url_for(&request.variant);
        let transport = |source: reqwest::Error| BenchError::Transport {
            variant: request.variant.clone(),
            source,
        };

        let _connection = self.acquire_connection(&request.variant).await?;

        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("numberCount", request.number_count.to_string()),
                ("delayMillis", request.delay_millis.to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BenchError::HttpStatus {
                variant: request.variant.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        let elapsed = start.elapsed();

        let count = validate_response(request, &body, elapsed)?;
        debug!(
            variant = %request.variant,
            elapsed_ms = elapsed.as_millis() as u64,
            numbers = count,
            "Call complete"
        );
        Ok(elapsed)
    }
}

/// Check a response body and its observed latency against `request`.
///
/// Lines are parsed first, then the minimum delay, then the element count.
/// Returns the number of integers parsed.
pub fn validate_response(
    request: &MeasurementRequest,
    body: &str,
    elapsed: Duration,
) -> BenchResult<usize> {
    let numbers = parse_numbers(&request.variant, body)?;

    let observed_ms = elapsed.as_millis() as u64;
    if observed_ms < request.delay_millis {
        return Err(BenchError::TooFast {
            variant: request.variant.clone(),
            expected_ms: request.delay_millis,
            observed_ms,
        });
    }

    let expected = request.number_count as usize;
    if numbers.len() != expected {
        return Err(BenchError::WrongElementCount {
            variant: request.variant.clone(),
            expected,
            found: numbers.len(),
        });
    }

    Ok(numbers.len())
}

fn parse_numbers(variant: &str, body: &str) -> BenchResult<Vec<i64>> {
    body.lines()
        .enumerate()
        .map(|(i, line)| {
            line.parse::<i64>().map_err(|_| BenchError::UnparsableLine {
                variant: variant.to_string(),
                line_number: i + 1,
                line: line.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariantConfig;
    use crate::error::ErrorKind;

    fn body_with(lines: usize) -> String {
        (0..lines).map(|i| format!("{}\n", i as i64 - 3)).collect()
    }

    fn request() -> MeasurementRequest {
        MeasurementRequest::new("blocking", 10, 100)
    }

    #[test]
    fn test_valid_response() {
        let count =
            validate_response(&request(), &body_with(10), Duration::from_millis(105)).unwrap();
        assert_eq!(count, 10);
    }

    #[test]
    fn test_response_without_trailing_newline() {
        let body = "1\n2\n3";
        let req = MeasurementRequest::new("reactive", 3, 0);
        assert_eq!(validate_response(&req, body, Duration::ZERO).unwrap(), 3);
    }

    #[test]
    fn test_crlf_lines_accepted() {
        let req = MeasurementRequest::new("reactive", 2, 0);
        assert_eq!(validate_response(&req, "7\r\n-8\r\n", Duration::ZERO).unwrap(), 2);
    }

    #[test]
    fn test_one_line_short_fails() {
        let err = validate_response(&request(), &body_with(9), Duration::from_millis(150))
            .unwrap_err();
        assert!(matches!(
            err,
            BenchError::WrongElementCount {
                expected: 10,
                found: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_one_line_extra_fails() {
        let err = validate_response(&request(), &body_with(11), Duration::from_millis(150))
            .unwrap_err();
        assert!(matches!(
            err,
            BenchError::WrongElementCount {
                expected: 10,
                found: 11,
                ..
            }
        ));
    }

    #[test]
    fn test_too_fast_fails() {
        let err = validate_response(&request(), &body_with(10), Duration::from_millis(99))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(
            err.to_string(),
            "Response returned abnormally fast from 'blocking': expected >=100ms, observed 99ms"
        );
    }

    #[test]
    fn test_exact_delay_is_accepted() {
        assert!(validate_response(&request(), &body_with(10), Duration::from_millis(100)).is_ok());
    }

    #[test]
    fn test_unparsable_line_fails_before_other_checks() {
        let body = "1\n2\nthree\n";
        let err = validate_response(&request(), body, Duration::ZERO).unwrap_err();
        match err {
            BenchError::UnparsableLine {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 3);
                assert_eq!(line, "three");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_line_in_middle_is_unparsable() {
        let req = MeasurementRequest::new("blocking", 3, 0);
        let err = validate_response(&req, "1\n\n2\n", Duration::ZERO).unwrap_err();
        assert!(matches!(err, BenchError::UnparsableLine { line_number: 2, .. }));
    }

    #[test]
    fn test_url_for_variants() {
        let config = BenchConfig {
            base_url: "http://example.test/".to_string(),
            variants: vec![
                VariantConfig::new("blocking"),
                VariantConfig {
                    name: "reactive".to_string(),
                    path: Some("/flux".to_string()),
                },
            ],
            ..BenchConfig::default()
        };
        let client = EndpointClient::new(&config).unwrap();
        assert_eq!(client.url_for("blocking"), "http://example.test/blocking");
        assert_eq!(client.url_for("reactive"), "http://example.test/flux");
        assert_eq!(client.url_for("other"), "http://example.test/other");
        assert_eq!(client.capacity(), 256);
    }

    #[tokio::test]
    async fn test_pool_exhaustion_times_out() {
        let config = BenchConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            parallelism: 1,
            max_connections: Some(1),
            pending_acquire_timeout_ms: 20,
            ..BenchConfig::default()
        };
        let client = EndpointClient::new(&config).unwrap();
        let _held = client.connections.clone().try_acquire_owned().unwrap();

        let err = client.call(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            BenchError::PoolExhausted {
                waited_ms: 20,
                capacity: 1,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
