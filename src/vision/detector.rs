// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detector backend
//!
//! Runs a YOLOv8-style ONNX export on CPU and yields [`RawDetection`]s in the
//! pixel space of the original image. Score filtering below the service
//! threshold, label normalization and ordering happen later in [`crate::scan`].

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use crate::scan::{ClassNames, RawDetection};

/// Score below which the detector itself discards candidates
pub const DEFAULT_SCORE_FLOOR: f32 = 0.25;

/// IoU above which a lower-scoring box of the same class is suppressed
pub const NMS_IOU_THRESHOLD: f32 = 0.7;

/// Upper bound on boxes returned per image
pub const MAX_DETECTIONS: usize = 300;

/// Side of the blank image used to warm the session
const WARMUP_SIZE: u32 = 64;

/// What a detector backend hands to the scan pipeline
#[derive(Debug, Clone, Default)]
pub struct DetectorOutput {
    pub detections: Vec<RawDetection>,
    /// Class names shipped with the model, if any
    pub class_names: ClassNames,
}

/// Object detector capability
///
/// Implementations must be safe to call from several requests at once.
pub trait DetectionBackend: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<DetectorOutput>;
}

/// ONNX Runtime YOLO detector
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    input_name: String,
    /// Square model input size
    imgsz: u32,
    score_floor: f32,
    class_names: ClassNames,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("imgsz", &self.imgsz)
            .field("score_floor", &self.score_floor)
            .field("class_names", &self.class_names)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub fn load<P: AsRef<Path>>(model_path: P, imgsz: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("Detector model not found: {}", model_path.display());
        }

        info!("Loading detector model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load detector model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let names_meta = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten());
        let class_names = ClassNames::new(names_meta.as_deref().and_then(parse_class_names));

        debug!(
            "Detector input: {}, model class names: {}",
            input_name,
            class_names.has_model_names()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            imgsz,
            score_floor: DEFAULT_SCORE_FLOOR,
            class_names,
        })
    }

    /// Override the detector's own score floor
    pub fn with_score_floor(mut self, floor: f32) -> Self {
        self.score_floor = floor.clamp(0.0, 1.0);
        self
    }

    pub fn imgsz(&self) -> u32 {
        self.imgsz
    }

    /// Run one inference on a blank image so the first request does not pay for it
    pub fn warm_up(&self) -> Result<()> {
        let start = Instant::now();
        self.detect(&DynamicImage::new_rgb8(WARMUP_SIZE, WARMUP_SIZE))?;
        info!("Detector warmed up in {}ms", start.elapsed().as_millis());
        Ok(())
    }

    /// Resize to the model input and lay out as NCHW scaled to [0, 1]
    fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let size = self.imgsz as usize;
        let rgb = image
            .resize_exact(self.imgsz, self.imgsz, FilterType::Triangle)
            .to_rgb8();

        let mut tensor = Array4::zeros((1, 3, size, size));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }
        tensor
    }
}

impl DetectionBackend for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<DetectorOutput> {
        let (orig_w, orig_h) = (image.width(), image.height());
        let input = self.preprocess(image);

        let candidates = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("Detector session lock poisoned"))?;

            let input_value = Value::from_array(input).context("Failed to create input tensor")?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .context("Detector inference failed")?;

            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract detector output")?;
            decode_yolo_output(&output, self.score_floor)?
        };

        let kept = non_max_suppression(candidates, NMS_IOU_THRESHOLD, MAX_DETECTIONS);
        let scale_x = orig_w as f32 / self.imgsz as f32;
        let scale_y = orig_h as f32 / self.imgsz as f32;
        let detections = kept
            .into_iter()
            .map(|d| rescale(d, scale_x, scale_y, orig_w as f32, orig_h as f32))
            .collect();

        Ok(DetectorOutput {
            detections,
            class_names: self.class_names.clone(),
        })
    }
}

/// Decode a `[1, 4 + nc, N]` (or transposed `[1, N, 4 + nc]`) prediction tensor
///
/// Each candidate is `cx, cy, w, h` in model input space followed by one score
/// per class; the best class is kept if it reaches `score_floor`.
pub fn decode_yolo_output(output: &ArrayViewD<f32>, score_floor: f32) -> Result<Vec<RawDetection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected detector output shape: {:?}", shape);
    }

    // Attributes are far fewer than anchors in every YOLOv8 export
    let channels_first = shape[1] <= shape[2];
    let (attrs, anchors) = if channels_first {
        (shape[1], shape[2])
    } else {
        (shape[2], shape[1])
    };
    if attrs < 5 {
        anyhow::bail!("Detector output has no class scores: {:?}", shape);
    }

    let at = |attr: usize, anchor: usize| {
        if channels_first {
            output[IxDyn(&[0, attr, anchor])]
        } else {
            output[IxDyn(&[0, anchor, attr])]
        }
    };

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let (class_id, score) = (4..attrs)
            .map(|attr| (attr - 4, at(attr, anchor)))
            .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !(score >= score_floor) {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        detections.push(RawDetection {
            class_id: class_id as u32,
            confidence: score,
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        });
    }

    Ok(detections)
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy class-wise non-maximum suppression, highest score first
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for cand in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(k, &cand) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

fn rescale(det: RawDetection, sx: f32, sy: f32, max_w: f32, max_h: f32) -> RawDetection {
    RawDetection {
        x1: (det.x1 * sx).clamp(0.0, max_w),
        y1: (det.y1 * sy).clamp(0.0, max_h),
        x2: (det.x2 * sx).clamp(0.0, max_w),
        y2: (det.y2 * sy).clamp(0.0, max_h),
        ..det
    }
}

/// Parse the `names` metadata written by YOLO exporters, e.g. `{0: 'lice', 1: 'nits'}`
pub fn parse_class_names(raw: &str) -> Option<HashMap<u32, String>> {
    let body = raw.trim().trim_start_matches('{').trim_end_matches('}');
    let names: HashMap<u32, String> = body
        .split(',')
        .filter_map(|entry| {
            let (key, value) = entry.split_once(':')?;
            let id = key.trim().trim_matches(|c| c == '\'' || c == '"').parse().ok()?;
            let name = value.trim().trim_matches(|c| c == '\'' || c == '"');
            Some((id, name.to_string()))
        })
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}
