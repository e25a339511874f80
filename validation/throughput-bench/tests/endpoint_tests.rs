//! End-to-end tests for the endpoint client against a local stand-in server.

use std::time::Duration;

use test_utils::{assert_in_range, Behavior, NumberServer};
use throughput_bench::{
    BenchConfig, BenchError, Endpoint, EndpointClient, ErrorKind, MeasurementRequest,
    VariantConfig,
};

fn config_for(base_url: String, variants: &[&str]) -> BenchConfig {
    BenchConfig {
        base_url,
        parallelism: 4,
        max_connections: Some(4),
        variants: variants.iter().map(|v| VariantConfig::new(*v)).collect(),
        ..BenchConfig::default()
    }
}

async fn call(
    server: &NumberServer,
    variant: &str,
    count: u32,
    delay: u64,
) -> Result<Duration, BenchError> {
    let client = EndpointClient::new(&config_for(server.base_url(), &[variant])).unwrap();
    client.call(&MeasurementRequest::new(variant, count, delay)).await
}

#[tokio::test]
async fn test_blocking_call_returns_latency_above_delay() {
    let server = NumberServer::honest_pair().await.unwrap();

    let latency = call(&server, "blocking", 10, 100).await.unwrap();

    assert_in_range!(latency.as_millis(), 100u128, 2_000u128);
    assert_eq!(server.calls(), 1);
}

#[tokio::test]
async fn test_reactive_call_succeeds() {
    let server = NumberServer::honest_pair().await.unwrap();
    let latency = call(&server, "reactive", 25, 20).await.unwrap();
    assert!(latency >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_missing_line_is_wrong_element_count() {
    let server = NumberServer::start([("blocking", Behavior::short_by(1))]).await.unwrap();

    let err = call(&server, "blocking", 10, 5).await.unwrap_err();

    assert!(matches!(
        err,
        BenchError::WrongElementCount {
            expected: 10,
            found: 9,
            ..
        }
    ));
    assert!(err.to_string().contains("Wrong element count"));
}

#[tokio::test]
async fn test_extra_line_is_wrong_element_count() {
    let server = NumberServer::start([("blocking", Behavior::long_by(1))]).await.unwrap();
    let err = call(&server, "blocking", 10, 5).await.unwrap_err();
    assert!(matches!(err, BenchError::WrongElementCount { found: 11, .. }));
}

#[tokio::test]
async fn test_endpoint_ignoring_delay_is_too_fast() {
    let server = NumberServer::start([("reactive", Behavior::ignoring_delay())]).await.unwrap();

    let err = call(&server, "reactive", 10, 500).await.unwrap_err();

    match err {
        BenchError::TooFast {
            expected_ms,
            observed_ms,
            ..
        } => {
            assert_eq!(expected_ms, 500);
            assert!(observed_ms < 500);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_garbage_line_is_unparsable() {
    let server = NumberServer::start([("blocking", Behavior::garbage_at(3))]).await.unwrap();
    let err = call(&server, "blocking", 10, 1).await.unwrap_err();
    assert!(matches!(err, BenchError::UnparsableLine { line_number: 4, .. }));
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[tokio::test]
async fn test_error_status_is_transport_failure() {
    let server = NumberServer::start([("blocking", Behavior::failing(500))]).await.unwrap();
    let err = call(&server, "blocking", 10, 1).await.unwrap_err();
    assert!(matches!(err, BenchError::HttpStatus { status: 500, .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Reserve a port, then release it so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = config_for(format!("http://{}", addr), &["blocking"]);
    let client = EndpointClient::new(&config).unwrap();
    let err = client
        .call(&MeasurementRequest::new("blocking", 10, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Transport { .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
}
