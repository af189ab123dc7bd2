#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use {
    axum::{Router, http::StatusCode, routing::post},
    hinata_config::GenerationConfig,
    hinata_media::{FailureReason, GenerationDispatcher, GenerationResult, MediaRequest, Tier},
    secrecy::Secret,
};

/// `/models/org/warm` answers 503 `warm_after` times, then 200.
/// `/models/org/gone` always answers 404.
async fn start_inference_mock(warm_after: usize) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new()
        .route(
            "/models/org/warm",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < warm_after {
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            [("content-type", "application/json")],
                            br#"{"error":"Model org/warm is currently loading"}"#.to_vec(),
                        )
                    } else {
                        (
                            StatusCode::OK,
                            [("content-type", "image/png")],
                            b"\x89PNG-data".to_vec(),
                        )
                    }
                }
            }),
        )
        .route(
            "/models/org/gone",
            post(|| async { (StatusCode::NOT_FOUND, "Not Found") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/models"), hits)
}

fn config(base: &str, endpoints: &[&str]) -> GenerationConfig {
    let mut cfg = GenerationConfig {
        huggingface_token: Some(Secret::new("hf_test".into())),
        inference_base_url: base.to_string(),
        ..GenerationConfig::default()
    };
    cfg.image.endpoints = endpoints.iter().map(|e| e.to_string()).collect();
    cfg.image.retry_backoff_secs = 0;
    cfg
}

#[tokio::test]
async fn loading_primary_recovers_on_retry() {
    let (base, hits) = start_inference_mock(1).await;
    let dispatcher = GenerationDispatcher::from_config(&config(&base, &["org/warm", "org/gone"])).unwrap();

    let out = dispatcher.dispatch(&MediaRequest::image("a lighthouse at night")).await;

    assert_eq!(
        out.result.into_bytes().unwrap().as_ref(),
        b"\x89PNG-data"
    );
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(out.attempts[1].tier, Tier::Retry);
}

#[tokio::test]
async fn missing_model_falls_through_to_next_endpoint() {
    let (base, hits) = start_inference_mock(0).await;
    let dispatcher = GenerationDispatcher::from_config(&config(&base, &["org/gone", "org/warm"])).unwrap();

    let out = dispatcher.dispatch(&MediaRequest::image("x")).await;

    assert!(out.result.is_success());
    assert_eq!(out.attempts.len(), 2);
    assert_eq!(out.attempts[1].tier, Tier::Fallback(1));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn every_endpoint_failing_is_a_typed_failure() {
    let (base, _) = start_inference_mock(usize::MAX).await;
    let dispatcher = GenerationDispatcher::from_config(&config(&base, &["org/warm", "org/gone"])).unwrap();

    let result = dispatcher.generate(&MediaRequest::image("x")).await;

    assert!(matches!(
        result,
        GenerationResult::Failure(FailureReason::Exhausted { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn no_token_short_circuits() {
    let (base, hits) = start_inference_mock(0).await;
    let mut cfg = config(&base, &["org/warm"]);
    cfg.huggingface_token = None;
    let dispatcher = GenerationDispatcher::from_config(&cfg).unwrap();

    let result = dispatcher.generate(&MediaRequest::image("x")).await;

    assert_eq!(result, GenerationResult::Failure(FailureReason::NotConfigured));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
