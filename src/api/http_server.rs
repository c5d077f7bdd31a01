// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::health::{detector_health_handler, tagger_health_handler};
use super::predict::predict_handler;
use super::tags::tag_predict_handler;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{ExplanationProvider, ScanModelManager};

/// Largest accepted request body: a maximal image after base64 expansion plus form overhead
pub const MAX_REQUEST_BODY: usize = MAX_IMAGE_SIZE / 3 * 4 + 64 * 1024;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<ScanModelManager>,
    /// Present only when an explanation credential is configured
    pub explainer: Option<Arc<dyn ExplanationProvider>>,
    /// Detector pipeline threshold (0.0-1.0)
    pub min_confidence: f32,
}

impl AppState {
    pub fn new(
        models: Arc<ScanModelManager>,
        explainer: Option<Arc<dyn ExplanationProvider>>,
        min_confidence: f32,
    ) -> Self {
        Self {
            models,
            explainer,
            min_confidence,
        }
    }

    /// State with no backends and explanations disabled
    pub fn new_for_test() -> Self {
        Self::new(
            Arc::new(ScanModelManager::default()),
            None,
            crate::config::DEFAULT_MIN_CONFIDENCE,
        )
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Routes of the detector service
pub fn detector_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(detector_health_handler))
        .route("/predict", post(predict_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Routes of the tag service
pub fn tagger_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(tagger_health_handler))
        .route("/predict", post(tag_predict_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Serve a router until Ctrl-C
pub async fn start_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down API server");
        })
        .await?;

    Ok(())
}
