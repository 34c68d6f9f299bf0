//! Resilient HTTP clients against a local mock backend.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::start_status_backend;
use outbound_resilience::config::{
    CircuitBreakerSettings, ClassifierSettings, ClientConfig, PipelineConfig, ResilienceConfig,
    RetrySettings,
};
use outbound_resilience::http::{ClientRegistry, HttpClientError};
use outbound_resilience::observability::{ChannelListener, ResilienceEvent, ResilienceListener};
use outbound_resilience::resilience::SamplePlacement;
use outbound_resilience::CircuitState;

fn fast_retry(max_attempts: u32) -> RetrySettings {
    RetrySettings {
        max_attempts,
        base_delay_ms: 10,
        max_delay_ms: 100,
        jitter: false,
    }
}

fn single_client(
    retry: Option<RetrySettings>,
    circuit_breaker: Option<CircuitBreakerSettings>,
) -> ResilienceConfig {
    ResilienceConfig {
        pipelines: vec![PipelineConfig {
            name: "backend".into(),
            placement: SamplePlacement::PerCall,
            retry,
            circuit_breaker,
            classifier: ClassifierSettings::default(),
        }],
        clients: vec![ClientConfig::for_pipeline("backend")],
        ..ResilienceConfig::default()
    }
}

#[tokio::test]
async fn test_retries_until_success() {
    let (addr, hits) = start_status_backend(vec![503, 503, 200]).await;
    let (listener, mut rx) = ChannelListener::new();
    let listeners: Vec<Arc<dyn ResilienceListener>> = vec![Arc::new(listener)];
    let registry =
        ClientRegistry::with_listeners(&single_client(Some(fast_retry(4)), None), &listeners)
            .unwrap();
    let client = registry.client("backend").unwrap();

    let response = client.get(&format!("http://{addr}/orders")).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "response 2");
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    let mut retries = 0;
    while let Ok(event) = rx.try_recv() {
        if let ResilienceEvent::RetryScheduled(record) = event {
            assert_eq!(record.pipeline, "backend");
            retries += 1;
        }
    }
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let (addr, hits) = start_status_backend(vec![404, 200]).await;
    let registry = ClientRegistry::from_config(&single_client(Some(fast_retry(4)), None)).unwrap();
    let client = registry.client("backend").unwrap();

    let response = client.get(&format!("http://{addr}/missing")).await.unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhausted_retries_return_last_response() {
    let (addr, hits) = start_status_backend(vec![500; 10]).await;
    let registry = ClientRegistry::from_config(&single_client(Some(fast_retry(3)), None)).unwrap();
    let client = registry.client("backend").unwrap();

    let response = client.get(&format!("http://{addr}/")).await.unwrap();

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_open_circuit_stops_calling_backend() {
    let (addr, hits) = start_status_backend(vec![500; 10]).await;
    let breaker = CircuitBreakerSettings {
        failure_ratio: 0.5,
        minimum_throughput: 2,
        sampling_duration_secs: 30,
        break_duration_secs: 60,
    };
    let registry = ClientRegistry::from_config(&single_client(None, Some(breaker))).unwrap();
    let client = registry.client("backend").unwrap();
    let url = format!("http://{addr}/");

    for _ in 0..2 {
        let response = client.get(&url).await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
    }
    assert_eq!(client.circuit_state(), Some(CircuitState::Open));

    let rejected = client.get(&url).await.unwrap_err();
    assert!(rejected.is_circuit_open());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (events, mut rx) = ChannelListener::new();
    let listeners: Vec<Arc<dyn ResilienceListener>> = vec![Arc::new(events)];
    let registry =
        ClientRegistry::with_listeners(&single_client(Some(fast_retry(2)), None), &listeners)
            .unwrap();
    let client = registry.client("backend").unwrap();

    let err = client.get(&format!("http://{addr}/")).await.unwrap_err();

    assert!(matches!(err, HttpClientError::Request(ref e) if e.is_connect()));
    assert!(matches!(rx.try_recv(), Ok(ResilienceEvent::RetryScheduled(_))));
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_sending() {
    let registry = ClientRegistry::from_config(&single_client(Some(fast_retry(2)), None)).unwrap();
    let client = registry.client("backend").unwrap();

    let err = client.get("not a url").await.unwrap_err();
    assert!(matches!(err, HttpClientError::InvalidUrl(_)));
}
