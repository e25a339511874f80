//! Bounded-concurrency batch execution.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::error::{BenchError, BenchResult};
use crate::metrics::{throughput, LatencyRecorder, LatencyStats};

/// Fires batches of calls through a worker pool of fixed size.
#[derive(Debug, Clone, Copy)]
pub struct LoadGenerator {
    parallelism: usize,
}

/// Timing for one completed batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub parallelism: usize,
    pub request_count: usize,
    pub duration: Duration,
    /// Slowest single call in the batch.
    pub max_latency: Duration,
    pub latency: LatencyStats,
}

impl BatchOutcome {
    pub fn requests_per_second(&self) -> f64 {
        throughput(self.request_count, self.duration)
    }
}

impl LoadGenerator {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run `call` `request_count` times with at most `parallelism` in flight.
    ///
    /// The batch timer starts before the first submission and stops once every
    /// submitted call has finished. After a call fails or panics nothing new is
    /// submitted and in-flight calls are awaited. The error returned is the first
    /// one joined, which follows completion order rather than submission order.
    pub async fn run_batch<F, Fut, T>(
        &self,
        request_count: usize,
        call: F,
    ) -> BenchResult<BatchOutcome>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BenchResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let call = Arc::new(call);
        let workers = Arc::new(Semaphore::new(self.parallelism));
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let mut recorder = LatencyRecorder::new();
        let mut first_error = None;

        let start = Instant::now();

        for _ in 0..request_count {
            let permit = match workers.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    first_error = Some(BenchError::Worker(e.to_string()));
                    break;
                }
            };
            if failed.load(Ordering::Acquire) {
                break;
            }

            let call = Arc::clone(&call);
            let failed = Arc::clone(&failed);
            tasks.spawn(async move {
                let mut guard = CallGuard {
                    failed,
                    succeeded: false,
                    _permit: permit,
                };
                let started = Instant::now();
                let result = call().await;
                let latency = started.elapsed();
                guard.succeeded = result.is_ok();
                drop(guard);
                result.map(|_| latency)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match flatten(joined) {
                Ok(latency) => recorder.record(latency),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        let duration = start.elapsed();

        if let Some(err) = first_error {
            return Err(err);
        }

        Ok(BatchOutcome {
            parallelism: self.parallelism,
            request_count,
            duration,
            max_latency: recorder.max(),
            latency: recorder.stats(),
        })
    }
}

/// Owns a worker slot for one call. Unless the call succeeded, dropping it
/// flags the batch as failed before the slot is released, including on panic.
struct CallGuard {
    failed: Arc<AtomicBool>,
    succeeded: bool,
    _permit: OwnedSemaphorePermit,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if !self.succeeded {
            self.failed.store(true, Ordering::Release);
        }
    }
}

fn flatten(joined: Result<BenchResult<Duration>, JoinError>) -> BenchResult<Duration> {
    joined.map_err(|e| BenchError::Worker(e.to_string()))?
}
