// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Liveness endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::http_server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorHealthResponse {
    pub status: String,
    /// Detector actually loaded, not merely configured
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaggerHealthResponse {
    pub status: String,
    pub ram_loaded: bool,
}

/// GET /health on the detector service
pub async fn detector_health_handler(State(state): State<AppState>) -> Json<DetectorHealthResponse> {
    Json(DetectorHealthResponse {
        status: "ok".to_string(),
        model_loaded: state.models.has_detector(),
    })
}

/// GET /health on the tag service
pub async fn tagger_health_handler(State(state): State<AppState>) -> Json<TaggerHealthResponse> {
    Json(TaggerHealthResponse {
        status: "ok".to_string(),
        ram_loaded: state.models.has_tagger(),
    })
}
