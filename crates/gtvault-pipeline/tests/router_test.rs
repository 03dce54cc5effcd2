//! Router-level tests: full request/response cycle through the axum stack,
//! driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    response::Response,
    Router,
};
use gtvault_core::{
    config::{Environment, GtvaultConfig},
    CipherSuite,
};
use gtvault_crypto::{EnvelopeCodec, EnvelopeKey, HEADER_SIZE};
use gtvault_pipeline::{router, Operation, PipelineMetrics, PipelineState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(key: [u8; 32], environment: Environment) -> (Router, Arc<PipelineMetrics>) {
    let mut config = GtvaultConfig::default();
    config.server.environment = environment;
    let codec = EnvelopeCodec::new(Arc::new(EnvelopeKey::from_bytes(key)), CipherSuite::Aes256Gcm);
    let metrics = Arc::new(PipelineMetrics::default());
    let state = PipelineState::new(codec, &config, metrics.clone());
    (router(state), metrics)
}

fn app() -> Router {
    app_with([7u8; 32], Environment::Production).0
}

fn encrypt_request(body: impl Into<Body>) -> Request<Body> {
    Request::post("/api/encrypt")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn decrypt_request(body: impl Into<Body>) -> Request<Body> {
    Request::post("/api/decrypt")
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(body.into())
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn seal(app: &Router, data: Value) -> Vec<u8> {
    let body = serde_json::to_vec(&json!({ "data": data })).unwrap();
    let response = app.clone().oneshot(encrypt_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_bytes(response).await
}

#[tokio::test]
async fn encrypt_then_decrypt_returns_original_data() {
    let app = app();
    let data = json!({
        "watchList": ["AAPL", "MSFT"],
        "completedLessons": ["intro"],
        "version": "1.0.0",
        "timestamp": "2026-01-01T00:00:00.000Z"
    });

    let envelope = seal(&app, data.clone()).await;
    assert!(envelope.len() > HEADER_SIZE);

    let response = app.oneshot(decrypt_request(envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], data);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn encrypt_sets_export_headers() {
    let body = serde_json::to_vec(&json!({ "data": { "watchList": ["X"] } })).unwrap();
    let response = app().oneshot(encrypt_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[CONTENT_TYPE], "application/octet-stream");

    let disposition = headers["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"gtvault-state-"));
    assert!(disposition.ends_with(".gt\""));

    let original: usize = headers["x-original-size"].to_str().unwrap().parse().unwrap();
    assert_eq!(original, r#"{"watchList":["X"]}"#.len());

    let encrypted: usize = headers["x-encrypted-size"].to_str().unwrap().parse().unwrap();
    let envelope = body_bytes(response).await;
    assert_eq!(encrypted, envelope.len());
    assert_eq!(encrypted, original + HEADER_SIZE);
}

#[tokio::test]
async fn encrypt_is_not_deterministic() {
    let app = app();
    let a = seal(&app, json!({"watchList": ["A"]})).await;
    let b = seal(&app, json!({"watchList": ["A"]})).await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn oversized_payload_is_rejected_with_413() {
    let limit = GtvaultConfig::default().limits.max_payload_bytes;
    // serialized `data` is the string plus its two quotes: limit + 1 bytes
    let body = serde_json::to_vec(&json!({ "data": "a".repeat(limit - 1) })).unwrap();

    let response = app().oneshot(encrypt_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn transport_limit_is_enforced_before_handler() {
    let limit = GtvaultConfig::default().limits.max_payload_bytes;
    let body = serde_json::to_vec(&json!({ "data": "a".repeat(limit * 3) })).unwrap();

    let response = app().oneshot(encrypt_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn wrong_content_type_is_rejected_with_400() {
    let request = Request::post("/api/encrypt")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"data":1}"#))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "INVALID_INPUT");

    let request = Request::post("/api/decrypt")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(vec![0u8; 64]))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_data_field_is_rejected_with_400() {
    let response = app()
        .oneshot(encrypt_request(r#"{"payload":{}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_INPUT");
    assert!(body["message"].as_str().unwrap().contains("data"));
}

#[tokio::test]
async fn empty_decrypt_body_is_rejected_with_400() {
    let response = app().oneshot(decrypt_request(Vec::new())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn short_envelope_is_malformed() {
    let response = app()
        .oneshot(decrypt_request(vec![0u8; HEADER_SIZE - 1]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "MALFORMED_DATA");
    assert_eq!(body["message"], "Invalid encrypted data format");
}

#[tokio::test]
async fn tampered_envelope_fails_integrity_check() {
    let app = app();
    let mut envelope = seal(&app, json!({"watchList": ["A", "B"]})).await;
    envelope[HEADER_SIZE] ^= 0x80;

    let response = app.oneshot(decrypt_request(envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "AUTH_TAG_VERIFICATION_FAILED");
}

#[tokio::test]
async fn envelope_from_another_key_fails_integrity_check() {
    let (ours, _) = app_with([1u8; 32], Environment::Production);
    let (theirs, _) = app_with([2u8; 32], Environment::Production);

    let envelope = seal(&theirs, json!({"completedLessons": ["l1"]})).await;
    let response = ours.oneshot(decrypt_request(envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "AUTH_TAG_VERIFICATION_FAILED");
}

#[tokio::test]
async fn non_json_plaintext_is_malformed() {
    let key = [9u8; 32];
    let codec = EnvelopeCodec::new(Arc::new(EnvelopeKey::from_bytes(key)), CipherSuite::Aes256Gcm);
    let envelope = codec.encrypt("definitely not json", None).unwrap().to_bytes();

    let (app, _) = app_with(key, Environment::Production);
    let response = app.oneshot(decrypt_request(envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "MALFORMED_DATA");
    assert_eq!(body["message"], "Decrypted data is not valid JSON");
}

#[tokio::test]
async fn details_are_only_exposed_in_development() {
    let (prod, _) = app_with([3u8; 32], Environment::Production);
    let response = prod.oneshot(decrypt_request(vec![0u8; 5])).await.unwrap();
    let body = body_json(response).await;
    assert!(body.get("details").is_none());

    let (dev, _) = app_with([3u8; 32], Environment::Development);
    let response = dev.oneshot(decrypt_request(vec![0u8; 5])).await.unwrap();
    let body = body_json(response).await;
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn outcomes_are_counted() {
    let (app, metrics) = app_with([4u8; 32], Environment::Production);

    let envelope = seal(&app, json!([1, 2, 3])).await;
    let response = app.clone().oneshot(decrypt_request(envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(decrypt_request(vec![0u8; 3])).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(metrics.request_count(Operation::Encrypt, "ok"), 1);
    assert_eq!(metrics.request_count(Operation::Decrypt, "ok"), 1);
    assert_eq!(metrics.request_count(Operation::Decrypt, "MALFORMED_DATA"), 1);
}

#[tokio::test]
async fn healthz_responds() {
    let response = app()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}
