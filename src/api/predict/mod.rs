// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector scan API endpoint module
//!
//! Provides POST /predict on the detector service.

pub mod handler;
pub mod request;

pub use crate::scan::PredictionResult as PredictResponse;
pub use handler::predict_handler;
pub use request::PredictRequest;
