// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /predict on the tag service (multipart upload)

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use scan_inference_node::{
    api::{tagger_router, AppState},
    scan::Label,
    vision::{ExplanationProvider, ScanModelManager, TagBackend},
};
use std::sync::Arc;
use tower::ServiceExt;

use crate::common::{png_bytes, CannedTagger, RecordingExplainer};

const BOUNDARY: &str = "scan-test-boundary";

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"scan.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn state_with(
    tagger: Option<Arc<dyn TagBackend>>,
    explainer: Option<Arc<dyn ExplanationProvider>>,
) -> AppState {
    let models = ScanModelManager::with_backends(None, tagger);
    AppState::new(Arc::new(models), explainer, 0.25)
}

async fn upload(state: AppState, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
    let response = tagger_router(state)
        .oneshot(
            Request::post("/predict")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or_default())
}

#[tokio::test]
async fn test_tags_mapped_to_label() {
    let tagger = Arc::new(CannedTagger::new("hair | nit | comb"));
    let state = state_with(Some(tagger.clone()), None);

    let (status, json) = upload(state, multipart_body("image", &png_bytes(32, 32))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "nits");
    assert!((json["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    assert!(json["explanation"].is_null());
    assert_eq!(tagger.call_count(), 1);
}

#[tokio::test]
async fn test_file_field_accepted() {
    let tagger = Arc::new(CannedTagger::new("white flakes"));
    let state = state_with(Some(tagger), None);

    let (status, json) = upload(state, multipart_body("file", &png_bytes(8, 8))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "dandruff");
}

#[tokio::test]
async fn test_stub_mode_without_tag_model() {
    let (status, json) = upload(
        state_with(None, None),
        multipart_body("image", &png_bytes(8, 8)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "clear");
    assert!((json["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_image_field_rejected() {
    let tagger = Arc::new(CannedTagger::new("lice"));
    let state = state_with(Some(tagger.clone()), None);

    let (status, json) = upload(state, multipart_body("photo", &png_bytes(8, 8))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(tagger.call_count(), 0);
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let tagger = Arc::new(CannedTagger::new("lice"));
    let state = state_with(Some(tagger.clone()), None);

    let (status, _) = upload(state, multipart_body("image", b"")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(tagger.call_count(), 0);
}

#[tokio::test]
async fn test_undecodable_upload_rejected_before_tagging() {
    let tagger = Arc::new(CannedTagger::new("lice"));
    let explainer = Arc::new(RecordingExplainer::replying(Some("unused")));
    let state = state_with(Some(tagger.clone()), Some(explainer.clone()));

    let (status, json) = upload(state, multipart_body("image", b"definitely not an image")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_image");
    assert_eq!(tagger.call_count(), 0);
    assert!(explainer.calls().is_empty());
}

#[tokio::test]
async fn test_explanation_receives_tag_label() {
    let tagger = Arc::new(CannedTagger::new("insect"));
    let explainer = Arc::new(RecordingExplainer::replying(Some("Looks like lice.")));
    let state = state_with(Some(tagger), Some(explainer.clone()));
    let png = png_bytes(8, 8);

    let (status, json) = upload(state, multipart_body("image", &png)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "lice");
    assert_eq!(json["explanation"], "Looks like lice.");

    let calls = explainer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Label::Lice);
    assert_eq!(calls[0].2, scan_inference_node::vision::encode_base64(&png));
}
