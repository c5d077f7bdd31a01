// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod health;
pub mod http_server;
pub mod predict;
pub mod tags;

pub use errors::{ApiError, ErrorResponse};
pub use health::{DetectorHealthResponse, TaggerHealthResponse};
pub use http_server::{detector_router, start_server, tagger_router, AppState};
pub use predict::{predict_handler, PredictRequest, PredictResponse};
pub use tags::{tag_predict_handler, TagPredictResponse};
