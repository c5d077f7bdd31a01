// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tag scan API endpoint module
//!
//! Provides POST /predict on the tag service.

pub mod handler;

pub use crate::scan::TagPrediction as TagPredictResponse;
pub use handler::tag_predict_handler;
