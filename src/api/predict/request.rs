// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector scan request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Request for a detector scan
///
/// `image` and `base64` carry the same payload, raw base64 or a data URI;
/// `base64` wins when both are set. The size hints are informational only,
/// the decoded image dimensions are authoritative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub base64: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,
}

impl PredictRequest {
    /// The image payload to decode
    pub fn image_payload(&self) -> Result<&str, ApiError> {
        [self.base64.as_deref(), self.image.as_deref()]
            .into_iter()
            .flatten()
            .find(|payload| !payload.trim().is_empty())
            .ok_or_else(|| ApiError::validation("image", "image is required"))
    }

    /// Size hint from the client, if both dimensions were given
    pub fn size_hint(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}
