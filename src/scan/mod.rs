// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scan result normalization
//!
//! Turns backend-specific model output into the stable response contract:
//! - Label normalization onto a closed vocabulary
//! - Detection filtering and box conversion (detector backend)
//! - Top-label selection and ordering (detector backend)
//! - Keyword-priority matching (tag backend)
//!
//! Everything here is pure and reentrant.

pub mod aggregate;
pub mod detection;
pub mod labels;
pub mod tags;

pub use aggregate::{aggregate, PredictionResult};
pub use detection::{
    filter_detections, ClassNames, Detection, FilterOutcome, FilterStats, RawDetection,
    DEFAULT_CLASS_NAMES, FALLBACK_CLASS_NAME, MIN_BOX_SIDE,
};
pub use labels::{normalize_label, normalize_optional_label, Label};
pub use tags::{match_tags, TagPrediction, KEYWORD_MATCH_CONFIDENCE, NO_MATCH_CONFIDENCE};
