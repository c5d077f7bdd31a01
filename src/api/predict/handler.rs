// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector scan endpoint handler

use axum::{extract::State, Json};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::PredictRequest;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::scan::{aggregate, filter_detections, FilterOutcome, PredictionResult};
use crate::vision::{decode_base64_image, strip_data_uri};

/// POST /predict - Detect lice, nits, dandruff or psoriasis in an image
///
/// # Request
/// - `image`: Base64-encoded image, optionally as a data URI (required)
/// - `base64`: Alias for `image`, preferred when present
/// - `width`, `height`: Size hints, ignored in favour of the decoded size
///
/// # Response
/// - `label`, `confidence`: Most confident detection, or `clear` / 0.0
/// - `detections`: Pixel-space boxes, highest confidence first
/// - `explanation`: Optional advisory text
/// - `image_width`, `image_height`: Decoded image size
///
/// # Errors
/// - 400 Bad Request: Missing, malformed or undecodable image
/// - 503 Service Unavailable: Detector not loaded
/// - 500 Internal Server Error: Inference failed
pub async fn predict_handler(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictionResult>, ApiError> {
    // 1. Decode before touching any model
    let payload = request.image_payload()?;
    let (image, image_info) = decode_base64_image(payload).map_err(|e| {
        warn!("Rejecting scan image: {}", e);
        ApiError::from(e)
    })?;

    if let Some((hint_w, hint_h)) = request.size_hint() {
        if (hint_w, hint_h) != (image_info.width, image_info.height) {
            debug!(
                "Size hint {}x{} differs from decoded {}x{}, using decoded size",
                hint_w, hint_h, image_info.width, image_info.height
            );
        }
    }

    // 2. Run the detector off the async runtime
    let detector = state
        .models
        .detector()
        .ok_or_else(|| ApiError::ServiceUnavailable("Detector model not loaded".to_string()))?;

    let start = Instant::now();
    let output = tokio::task::spawn_blocking(move || detector.detect(&image))
        .await
        .map_err(|e| ApiError::InternalError(format!("Detector task failed: {}", e)))??;
    info!(
        "inference took {}ms image={}x{}",
        start.elapsed().as_millis(),
        image_info.width,
        image_info.height
    );

    // 3. Normalize into the response contract
    let FilterOutcome { detections, stats } =
        filter_detections(&output.detections, state.min_confidence, &output.class_names);
    let result = aggregate(detections).with_image_size(image_info.width, image_info.height);

    info!(
        "predict result image={}x{} raw_boxes={} below_min_conf={} min_conf={:.2} returned={} label={} top_conf={:.3}",
        image_info.width,
        image_info.height,
        stats.raw_boxes,
        stats.below_threshold,
        state.min_confidence,
        stats.returned,
        result.label,
        result.confidence
    );

    // 4. Optional explanation, never fails the request
    let explanation = match &state.explainer {
        Some(explainer) => {
            explainer
                .explain(result.label, result.confidence, strip_data_uri(payload))
                .await
        }
        None => None,
    };

    Ok(Json(result.with_explanation(explanation)))
}
