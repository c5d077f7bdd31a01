// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scan model manager for loading and holding the inference backends

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::vision::detector::{DetectionBackend, YoloDetector, DEFAULT_SCORE_FLOOR};
use crate::vision::tagger::{RamTagger, TagBackend};

/// Configuration for loading scan models
#[derive(Debug, Clone)]
pub struct ScanModelConfig {
    /// Detector ONNX file (optional)
    pub detector_model_path: Option<PathBuf>,
    /// Tag model directory (optional)
    pub tagger_model_dir: Option<PathBuf>,
    /// Detector input resolution
    pub infer_imgsz: u32,
    /// Detector's own score floor
    pub detector_score_floor: f32,
}

impl Default for ScanModelConfig {
    fn default() -> Self {
        Self {
            detector_model_path: Some(PathBuf::from(crate::config::DEFAULT_MODEL_PATH)),
            tagger_model_dir: Some(PathBuf::from(crate::config::DEFAULT_RAM_MODEL_DIR)),
            infer_imgsz: crate::config::DEFAULT_INFER_IMGSZ,
            detector_score_floor: DEFAULT_SCORE_FLOOR,
        }
    }
}

/// Information about a scan model
#[derive(Debug, Clone, PartialEq)]
pub struct ScanModelInfo {
    pub name: String,
    /// detector or tagger
    pub model_type: String,
    /// Loaded and ready, not merely configured
    pub available: bool,
}

/// Owner of the loaded backends
///
/// Built once at startup and shared read-only between requests. Missing
/// model files are handled gracefully; callers decide whether that is fatal.
#[derive(Default)]
pub struct ScanModelManager {
    detector: Option<Arc<dyn DetectionBackend>>,
    tagger: Option<Arc<dyn TagBackend>>,
}

impl ScanModelManager {
    /// Load the configured models
    ///
    /// The detector is warmed up after loading. Blocking; call before serving.
    pub fn new(config: ScanModelConfig) -> Self {
        let detector = config.detector_model_path.as_ref().and_then(|path| {
            let start = Instant::now();
            let loaded = YoloDetector::load(path, config.infer_imgsz).and_then(|detector| {
                let detector = detector.with_score_floor(config.detector_score_floor);
                detector.warm_up()?;
                Ok(detector)
            });
            match loaded {
                Ok(detector) => {
                    tracing::info!(
                        "✅ Detector loaded and warmed in {:.1}s path={}",
                        start.elapsed().as_secs_f32(),
                        path.display()
                    );
                    Some(Arc::new(detector) as Arc<dyn DetectionBackend>)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load detector from {}: {:#}", path.display(), e);
                    None
                }
            }
        });

        let tagger = config.tagger_model_dir.as_ref().and_then(|dir| {
            match RamTagger::load(dir) {
                Ok(tagger) => {
                    tracing::info!("✅ Tag model loaded from {}", dir.display());
                    Some(Arc::new(tagger) as Arc<dyn TagBackend>)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load tag model from {}: {:#}", dir.display(), e);
                    None
                }
            }
        });

        Self { detector, tagger }
    }

    /// Build a manager around already-constructed backends
    pub fn with_backends(
        detector: Option<Arc<dyn DetectionBackend>>,
        tagger: Option<Arc<dyn TagBackend>>,
    ) -> Self {
        Self { detector, tagger }
    }

    pub fn detector(&self) -> Option<Arc<dyn DetectionBackend>> {
        self.detector.clone()
    }

    pub fn tagger(&self) -> Option<Arc<dyn TagBackend>> {
        self.tagger.clone()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn has_tagger(&self) -> bool {
        self.tagger.is_some()
    }

    /// List all scan models and whether they are loaded
    pub fn list_models(&self) -> Vec<ScanModelInfo> {
        vec![
            ScanModelInfo {
                name: "yolo".to_string(),
                model_type: "detector".to_string(),
                available: self.has_detector(),
            },
            ScanModelInfo {
                name: "ram".to_string(),
                model_type: "tagger".to_string(),
                available: self.has_tagger(),
            },
        ]
    }
}
