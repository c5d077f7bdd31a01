// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image tagging backend
//!
//! Wraps a Recognize-Anything style ONNX export: one sigmoid score per entry
//! of a tag list, thresholded and joined into a `" | "` tag string.

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Model file expected inside the tag model directory
pub const TAG_MODEL_FILE: &str = "ram.onnx";

/// One tag per line, in model output order
pub const TAG_LIST_FILE: &str = "ram_tag_list.txt";

/// Square input size of the tag model
pub const TAG_INPUT_SIZE: u32 = 384;

/// Default per-tag sigmoid threshold
pub const DEFAULT_TAG_THRESHOLD: f32 = 0.68;

/// Separator used when joining tags
pub const TAG_JOINER: &str = " | ";

/// Mean values for normalization (ImageNet)
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Tag generation capability
pub trait TagBackend: Send + Sync {
    /// Produce a delimited tag string for an image
    fn generate_tags(&self, image: &DynamicImage) -> Result<String>;
}

/// ONNX Runtime image tagger
#[derive(Clone)]
pub struct RamTagger {
    session: Arc<Mutex<Session>>,
    input_name: String,
    tags: Arc<Vec<String>>,
    threshold: f32,
}

impl std::fmt::Debug for RamTagger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RamTagger")
            .field("input_name", &self.input_name)
            .field("tag_count", &self.tags.len())
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl RamTagger {
    /// Load the tag model and tag list from a directory
    ///
    /// Expected files:
    /// - ram.onnx
    /// - ram_tag_list.txt
    pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let model_path: PathBuf = model_dir.join(TAG_MODEL_FILE);
        if !model_path.exists() {
            anyhow::bail!("Tag model not found: {}", model_path.display());
        }

        let tags = load_tag_list(&model_dir.join(TAG_LIST_FILE))?;

        info!("Loading tag model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load tag model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "image".to_string());

        debug!("Tag model input: {}, {} tags", input_name, tags.len());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            tags: Arc::new(tags),
            threshold: DEFAULT_TAG_THRESHOLD,
        })
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    fn preprocess(image: &DynamicImage) -> Array4<f32> {
        let size = TAG_INPUT_SIZE as usize;
        let rgb = image
            .resize_exact(TAG_INPUT_SIZE, TAG_INPUT_SIZE, FilterType::Triangle)
            .to_rgb8();

        let mut tensor = Array4::zeros((1, 3, size, size));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
            }
        }
        tensor
    }
}

impl TagBackend for RamTagger {
    fn generate_tags(&self, image: &DynamicImage) -> Result<String> {
        let input = Self::preprocess(image);

        let logits: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("Tag session lock poisoned"))?;

            let input_value = Value::from_array(input).context("Failed to create input tensor")?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .context("Tag inference failed")?;

            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract tag output")?;
            output.iter().copied().collect()
        };

        Ok(tags_from_logits(&logits, &self.tags, self.threshold))
    }
}

/// Read a newline-separated tag list, skipping blank lines
pub fn load_tag_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tag list {}", path.display()))?;
    let tags: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if tags.is_empty() {
        anyhow::bail!("Tag list {} is empty", path.display());
    }
    Ok(tags)
}

/// Join the tags whose sigmoid score reaches `threshold`
pub fn tags_from_logits(logits: &[f32], tags: &[String], threshold: f32) -> String {
    logits
        .iter()
        .zip(tags)
        .filter(|(logit, _)| sigmoid(**logit) >= threshold)
        .map(|(_, tag)| tag.as_str())
        .collect::<Vec<_>>()
        .join(TAG_JOINER)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
