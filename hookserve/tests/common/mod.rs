#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use hookserve::{
    ClientConfig, ConversionHook, ConversionRequest, ConversionResponse, Initialize,
    ResourceDescriptor, ServerConfig,
};
use serde_json::{Value, json};
use std::{net::IpAddr, sync::Arc, time::Duration};
use tower::ServiceExt;

// ============================================================================
// Test Hooks
// ============================================================================

/// Converts objects by rewriting their `apiVersion`.
pub struct Upgrader;

impl Initialize for Upgrader {}

impl ConversionHook for Upgrader {
    fn conversion_resource(&self) -> ResourceDescriptor {
        ResourceDescriptor::new("a.example.io", "v1", "widgetconversions", "widgetconversion")
    }

    fn convert(&self, request: &ConversionRequest) -> ConversionResponse {
        let objects = request
            .objects
            .iter()
            .map(|o| {
                let mut o = o.clone();
                o["apiVersion"] = json!(request.desired_api_version);
                o
            })
            .collect();
        ConversionResponse::success(&request.uid, objects)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn server_config() -> ServerConfig {
    ServerConfig {
        bind_address: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        request_timeout: Duration::from_secs(5),
        shutdown_grace: Duration::from_secs(1),
        ..ServerConfig::default()
    }
}

pub fn client() -> Arc<ClientConfig> {
    Arc::new(ClientConfig::new("https://127.0.0.1:6443"))
}

pub fn admission_body(api_version: &str, uid: &str, operation: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "apiVersion": api_version,
        "kind": "AdmissionReview",
        "request": {
            "uid": uid,
            "kind": {"group": "a.example.io", "version": "v1", "kind": "Widget"},
            "resource": {"group": "a.example.io", "version": "v1", "resource": "widgets"},
            "operation": operation,
            "userInfo": {"username": "system:admin"},
            "object": {"metadata": {"name": "w"}}
        }
    }))
    .unwrap()
}

pub fn conversion_body(uid: &str, desired: &str, names: &[&str]) -> Vec<u8> {
    let objects: Vec<Value> = names
        .iter()
        .map(|n| {
            json!({"apiVersion": "a.example.io/v1beta1", "kind": "Widget", "metadata": {"name": n}})
        })
        .collect();
    serde_json::to_vec(&json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "ConversionReview",
        "request": {"uid": uid, "desiredAPIVersion": desired, "objects": objects}
    }))
    .unwrap()
}

// ============================================================================
// Router helpers
// ============================================================================

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

pub async fn post_json(router: &Router, path: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

pub async fn get_json(router: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

pub async fn get_text(router: &Router, path: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;
    (status, String::from_utf8(body.to_vec()).unwrap())
}
