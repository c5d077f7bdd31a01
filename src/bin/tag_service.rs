// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use scan_inference_node::{
    api::{start_server, tagger_router, AppState},
    config::{TagServiceConfig, DEFAULT_MIN_CONFIDENCE},
    vision::{ExplanationClient, ExplanationProvider, ScanModelConfig, ScanModelManager},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = TagServiceConfig::from_env();
    tracing::info!(
        "🚀 Starting tag inference node: model_dir={} explanations={}",
        config.ram_model_dir.display(),
        config.explanation.enabled()
    );

    let model_config = ScanModelConfig {
        detector_model_path: None,
        tagger_model_dir: Some(config.ram_model_dir.clone()),
        ..ScanModelConfig::default()
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

    // A missing tag model is not fatal: requests get the stub result
    if !models.has_tagger() {
        tracing::warn!("⚠️ Tag model unavailable, serving stub results");
    }

    let explainer = ExplanationClient::from_config(&config.explanation)?
        .map(|client| Arc::new(client) as Arc<dyn ExplanationProvider>);

    let state = AppState::new(Arc::new(models), explainer, DEFAULT_MIN_CONFIDENCE);
    start_server(tagger_router(state), config.bind_addr).await
}
