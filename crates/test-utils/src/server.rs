//! In-process HTTP stand-in for the endpoint variants.
//!
//! Serves `GET /{variant}?numberCount=n&delayMillis=d` on an ephemeral local
//! port. Each variant can be told to break the contract in a specific way so
//! tests can exercise the client's validation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::numbers::{number_body, seeded_numbers};

/// How a stand-in variant responds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Behavior {
    /// Added to the requested count (negative drops lines).
    pub line_offset: i64,
    /// Answer immediately instead of waiting `delayMillis`.
    pub ignore_delay: bool,
    /// Replace the line at this index with text that is not an integer.
    pub garbage_line: Option<usize>,
    /// Respond with this status and an empty body.
    pub status: Option<u16>,
}

impl Behavior {
    /// Follows the contract exactly.
    pub fn honest() -> Self {
        Self::default()
    }

    pub fn short_by(lines: i64) -> Self {
        Self {
            line_offset: -lines,
            ..Self::default()
        }
    }

    pub fn long_by(lines: i64) -> Self {
        Self {
            line_offset: lines,
            ..Self::default()
        }
    }

    pub fn ignoring_delay() -> Self {
        Self {
            ignore_delay: true,
            ..Self::default()
        }
    }

    pub fn garbage_at(index: usize) -> Self {
        Self {
            garbage_line: Some(index),
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NumberParams {
    number_count: u32,
    delay_millis: u64,
}

struct ServerState {
    behaviors: HashMap<String, Behavior>,
    calls: AtomicUsize,
}

/// A running stand-in server. Shuts down when dropped.
pub struct NumberServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl NumberServer {
    /// Start serving the given variants on `127.0.0.1` with an ephemeral port.
    pub async fn start<I, S>(variants: I) -> std::io::Result<Self>
    where
        I: IntoIterator<Item = (S, Behavior)>,
        S: Into<String>,
    {
        let state = Arc::new(ServerState {
            behaviors: variants.into_iter().map(|(n, b)| (n.into(), b)).collect(),
            calls: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/:variant", get(numbers_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Honest `blocking` and `reactive` variants.
    pub async fn honest_pair() -> std::io::Result<Self> {
        Self::start([
            ("blocking", Behavior::honest()),
            ("reactive", Behavior::honest()),
        ])
        .await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, including rejected ones.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

impl Drop for NumberServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn numbers_handler(
    State(state): State<Arc<ServerState>>,
    Path(variant): Path<String>,
    Query(params): Query<NumberParams>,
) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);

    let Some(behavior) = state.behaviors.get(&variant).copied() else {
        return (StatusCode::NOT_FOUND, format!("unknown variant '{}'", variant)).into_response();
    };

    if let Some(status) = behavior.status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return status.into_response();
    }

    if !behavior.ignore_delay {
        tokio::time::sleep(Duration::from_millis(params.delay_millis)).await;
    }

    let count = (params.number_count as i64 + behavior.line_offset).max(0) as usize;
    let numbers = seeded_numbers(params.number_count as u64, count);
    let mut body = number_body(&numbers);

    if let Some(index) = behavior.garbage_line {
        body = body
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i == index {
                    "not-a-number\n".to_string()
                } else {
                    format!("{}\n", line)
                }
            })
            .collect();
    }

    (StatusCode::OK, body).into_response()
}
