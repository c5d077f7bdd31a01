// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health on both services

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use scan_inference_node::{
    api::{detector_router, tagger_router, AppState},
    vision::ScanModelManager,
};
use std::sync::Arc;
use tower::ServiceExt;

use crate::common::{CannedDetector, CannedTagger};

async fn get_health(app: axum::Router) -> serde_json::Value {
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_detector_health_reports_model_loaded() {
    let models = ScanModelManager::with_backends(Some(Arc::new(CannedDetector::default())), None);
    let state = AppState::new(Arc::new(models), None, 0.25);

    let json = get_health(detector_router(state)).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], true);
}

#[tokio::test]
async fn test_detector_health_without_model() {
    let json = get_health(detector_router(AppState::new_for_test())).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], false);
}

#[tokio::test]
async fn test_tagger_health_reports_ram_loaded() {
    let models = ScanModelManager::with_backends(None, Some(Arc::new(CannedTagger::new("hair"))));
    let state = AppState::new(Arc::new(models), None, 0.25);

    let json = get_health(tagger_router(state)).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ram_loaded"], true);
}

#[tokio::test]
async fn test_tagger_health_in_stub_mode() {
    let json = get_health(tagger_router(AppState::new_for_test())).await;
    assert_eq!(json["ram_loaded"], false);
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let response = detector_router(AppState::new_for_test())
        .oneshot(
            Request::options("/predict")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
