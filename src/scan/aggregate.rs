// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Top-label selection and final ordering of detections

use serde::{Deserialize, Serialize};

use super::detection::Detection;
use super::labels::Label;

/// Detector pipeline response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Label of the most confident detection, `clear` when there is none
    pub label: Label,
    /// Confidence of the most confident detection, 0.0 when there is none
    pub confidence: f32,
    pub explanation: Option<String>,
    /// Sorted by confidence, highest first
    pub detections: Vec<Detection>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
}

impl PredictionResult {
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_width = Some(width);
        self.image_height = Some(height);
        self
    }

    pub fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation;
        self
    }
}

/// Maximum-confidence detection, first emitted wins on ties
fn running_max(detections: &[Detection]) -> Option<(Label, f32)> {
    let mut top: Option<(Label, f32)> = None;
    for det in detections {
        match top {
            Some((_, best)) if det.confidence <= best => {}
            _ => top = Some((det.label, det.confidence)),
        }
    }
    top
}

/// Build the response from already-filtered detections
pub fn aggregate(mut detections: Vec<Detection>) -> PredictionResult {
    let top = running_max(&detections);

    // Stable, so equal confidences keep emission order
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    debug_assert_eq!(
        top,
        detections.first().map(|d| (d.label, d.confidence)),
        "running max and sorted head disagree"
    );

    let (label, confidence) = top.unwrap_or((Label::Clear, 0.0));

    PredictionResult {
        label,
        confidence,
        explanation: None,
        detections,
        image_width: None,
        image_height: None,
    }
}
