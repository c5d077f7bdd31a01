// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod scan;
pub mod vision;

pub use api::{detector_router, tagger_router, ApiError, AppState};
pub use config::{ExplanationConfig, ScanConfig, TagServiceConfig};
pub use scan::{
    aggregate, filter_detections, match_tags, normalize_label, Detection, Label, PredictionResult,
    RawDetection, TagPrediction,
};
pub use vision::{DetectionBackend, ExplanationProvider, ScanModelManager, TagBackend};
