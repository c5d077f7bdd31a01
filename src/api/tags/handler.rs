// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tag scan endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::scan::{match_tags, TagPrediction};
use crate::vision::{decode_image_bytes, encode_base64};

/// Form fields accepted for the uploaded image
const IMAGE_FIELDS: [&str; 2] = ["image", "file"];

/// POST /predict - Classify an uploaded image from its generated tags
///
/// Accepts multipart/form-data with the image in field `image` (or `file`).
/// Without a loaded tag model the result is the stub (`clear`, 0.9).
///
/// # Errors
/// - 400 Bad Request: Missing, empty or undecodable upload
/// - 500 Internal Server Error: Tag inference failed
pub async fn tag_predict_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TagPrediction>, ApiError> {
    let bytes = read_image_field(&mut multipart).await?;
    if bytes.is_empty() {
        return Err(ApiError::validation("image", "Empty image"));
    }

    let (image, image_info) = decode_image_bytes(&bytes).map_err(|e| {
        warn!("Rejecting uploaded image: {}", e);
        ApiError::from(e)
    })?;
    debug!(
        "Decoded upload: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    let prediction = match state.models.tagger() {
        Some(tagger) => {
            let tag_string = tokio::task::spawn_blocking(move || tagger.generate_tags(&image))
                .await
                .map_err(|e| ApiError::InternalError(format!("Tag task failed: {}", e)))??;
            debug!("Generated tags: {}", tag_string);
            match_tags(&tag_string)
        }
        None => {
            info!("Tag model not loaded, returning stub result");
            TagPrediction::stub()
        }
    };

    let explanation = match &state.explainer {
        Some(explainer) => {
            explainer
                .explain(prediction.label, prediction.confidence, &encode_base64(&bytes))
                .await
        }
        None => None,
    };

    info!(
        "tag result label={} confidence={:.2} explanation={}",
        prediction.label,
        prediction.confidence,
        explanation.is_some()
    );

    Ok(Json(prediction.with_explanation(explanation)))
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation("image", &format!("Malformed form data: {}", e)))?
    {
        let is_image = field
            .name()
            .map(|name| IMAGE_FIELDS.contains(&name))
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation("image", &format!("Failed to read upload: {}", e)))?;
        return Ok(data.to_vec());
    }

    Err(ApiError::validation(
        "image",
        "Missing image in form (field: image or file)",
    ))
}
