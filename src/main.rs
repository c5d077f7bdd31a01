// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use scan_inference_node::{
    api::{detector_router, start_server, AppState},
    config::ScanConfig,
    vision::{
        detector::DEFAULT_SCORE_FLOOR, ExplanationClient, ExplanationProvider, ScanModelConfig,
        ScanModelManager,
    },
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ScanConfig::from_env();
    tracing::info!(
        "🚀 Starting scan inference node: model={} min_conf={:.2} imgsz={} explanations={}",
        config.model_path.display(),
        config.min_confidence,
        config.infer_imgsz,
        config.explanation.enabled()
    );

    let model_config = ScanModelConfig {
        detector_model_path: Some(config.model_path.clone()),
        tagger_model_dir: None,
        infer_imgsz: config.infer_imgsz,
        detector_score_floor: config.min_confidence.min(DEFAULT_SCORE_FLOOR),
    };
    let models = tokio::task::spawn_blocking(move || ScanModelManager::new(model_config)).await?;
    for model in models.list_models() {
        tracing::info!(
            "model {} ({}) available={}",
            model.name,
            model.model_type,
            model.available
        );
    }

    // The detector is the whole point of this service
    if !models.has_detector() {
        anyhow::bail!(
            "Detector model could not be loaded from {}",
            config.model_path.display()
        );
    }

    let explainer = ExplanationClient::from_config(&config.explanation)?
        .map(|client| Arc::new(client) as Arc<dyn ExplanationProvider>);

    let state = AppState::new(Arc::new(models), explainer, config.min_confidence);
    start_server(detector_router(state), config.bind_addr).await
}
