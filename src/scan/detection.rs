// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection filtering and corner-box to center-box conversion

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::labels::{normalize_label, Label};

/// Smallest width/height reported for a detection, in pixels
pub const MIN_BOX_SIDE: f32 = 4.0;

/// Raw label used when a class index has no name
pub const FALLBACK_CLASS_NAME: &str = "lice";

/// Class table assumed when the model does not ship its own names
pub const DEFAULT_CLASS_NAMES: [&str; 4] = ["lice", "nits", "dandruff", "psoriasis"];

/// One detection as emitted by the detector backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Class index predicted by the model
    pub class_id: u32,
    /// Model score (0.0-1.0)
    pub confidence: f32,
    /// Box corners in pixel coordinates of the decoded image
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// A reportable finding in center/size form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: Label,
    pub confidence: f32,
    /// Box center x in pixels
    pub x: f32,
    /// Box center y in pixels
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Class-index to raw-label lookup
///
/// Holds the model's own names when it ships them, otherwise
/// [`DEFAULT_CLASS_NAMES`] applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames {
    model_names: Option<HashMap<u32, String>>,
}

impl ClassNames {
    pub fn new(model_names: Option<HashMap<u32, String>>) -> Self {
        Self { model_names }
    }

    pub fn has_model_names(&self) -> bool {
        self.model_names.is_some()
    }

    /// Raw label for a class index; unmapped indices resolve to [`FALLBACK_CLASS_NAME`]
    pub fn resolve(&self, class_id: u32) -> &str {
        match &self.model_names {
            Some(names) => names
                .get(&class_id)
                .map(String::as_str)
                .unwrap_or(FALLBACK_CLASS_NAME),
            None => DEFAULT_CLASS_NAMES
                .get(class_id as usize)
                .copied()
                .unwrap_or(FALLBACK_CLASS_NAME),
        }
    }
}

/// Box counts gathered while filtering, logged per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub raw_boxes: usize,
    pub below_threshold: usize,
    pub clear_dropped: usize,
    pub returned: usize,
}

/// Filtered detections plus the counts that produced them
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub detections: Vec<Detection>,
    pub stats: FilterStats,
}

impl Detection {
    /// Convert a corner box to center/size form, flooring each side at [`MIN_BOX_SIDE`]
    pub fn from_corners(label: Label, confidence: f32, raw: &RawDetection) -> Self {
        Self {
            label,
            confidence,
            x: (raw.x1 + raw.x2) / 2.0,
            y: (raw.y1 + raw.y2) / 2.0,
            width: (raw.x2 - raw.x1).max(MIN_BOX_SIDE),
            height: (raw.y2 - raw.y1).max(MIN_BOX_SIDE),
        }
    }
}

/// Drop low-confidence and non-reportable boxes, keeping emission order
pub fn filter_detections(
    raw: &[RawDetection],
    min_confidence: f32,
    class_names: &ClassNames,
) -> FilterOutcome {
    let mut stats = FilterStats {
        raw_boxes: raw.len(),
        ..FilterStats::default()
    };
    let mut detections = Vec::with_capacity(raw.len());

    for det in raw {
        // NaN scores fail this comparison as well
        if !(det.confidence >= min_confidence) {
            stats.below_threshold += 1;
            continue;
        }

        let label = normalize_label(class_names.resolve(det.class_id));
        if label.is_clear() {
            stats.clear_dropped += 1;
            continue;
        }

        detections.push(Detection::from_corners(label, det.confidence, det));
    }

    stats.returned = detections.len();
    debug!(
        "filtered detections: raw={} below_min_conf={} clear={} kept={}",
        stats.raw_boxes, stats.below_threshold, stats.clear_dropped, stats.returned
    );

    FilterOutcome { detections, stats }
}
