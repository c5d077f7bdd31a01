// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision backends for scan requests
//!
//! This module provides:
//! - Image decoding for base64 and raw uploads
//! - Object detection via a YOLO ONNX model
//! - Image tagging via a Recognize-Anything ONNX model
//! - Optional result explanations from an external chat API
//!
//! Both models run on CPU only.

pub mod detector;
pub mod explain_client;
pub mod image_utils;
pub mod model_manager;
pub mod tagger;

pub use detector::{DetectionBackend, DetectorOutput, YoloDetector};
pub use explain_client::{ExplanationClient, ExplanationProvider};
pub use image_utils::{
    decode_base64_image, decode_image_bytes, detect_format, encode_base64, strip_data_uri,
    ImageError, ImageInfo,
};
pub use model_manager::{ScanModelConfig, ScanModelInfo, ScanModelManager};
pub use tagger::{RamTagger, TagBackend};
