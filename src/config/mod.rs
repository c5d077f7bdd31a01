// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment-driven service configuration
//!
//! Every setting has a default, so both services start with an empty
//! environment. A missing explanation credential disables explanations.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "./models/yolov8n.onnx";
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_INFER_IMGSZ: u32 = 640;
pub const DEFAULT_RAM_MODEL_DIR: &str = "./models/ram-onnx";
pub const DEFAULT_EXPLANATION_API_BASE: &str = "https://api.deepseek.com";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_DETECTOR_PORT: u16 = 8000;
pub const DEFAULT_TAG_PORT: u16 = 8001;

/// Credential and endpoint for the explanation provider
#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationConfig {
    pub api_key: Option<String>,
    pub api_base: String,
}

impl ExplanationConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("DEEPSEEK_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let api_base = lookup("DEEPSEEK_API_BASE")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXPLANATION_API_BASE.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        Self { api_key, api_base }
    }
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_EXPLANATION_API_BASE.to_string(),
        }
    }
}

/// Detector service settings
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Detector ONNX file
    pub model_path: PathBuf,
    /// Detections scoring below this are dropped (0.0-1.0)
    pub min_confidence: f32,
    /// Square inference resolution in pixels
    pub infer_imgsz: u32,
    pub explanation: ExplanationConfig,
    pub bind_addr: SocketAddr,
}

impl ScanConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup("SCAN_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let min_confidence = lookup("SCAN_MIN_CONFIDENCE")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_MIN_CONFIDENCE)
            .clamp(0.0, 1.0);

        let infer_imgsz = lookup("SCAN_INFER_IMGSZ")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_INFER_IMGSZ);

        Self {
            model_path,
            min_confidence,
            infer_imgsz,
            explanation: ExplanationConfig::from_lookup(&lookup),
            bind_addr: bind_addr(&lookup, DEFAULT_DETECTOR_PORT),
        }
    }
}

/// Tag service settings
#[derive(Debug, Clone, PartialEq)]
pub struct TagServiceConfig {
    /// Directory holding the tag model and its tag list
    pub ram_model_dir: PathBuf,
    pub explanation: ExplanationConfig,
    pub bind_addr: SocketAddr,
}

impl TagServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ram_model_dir = lookup("RAM_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RAM_MODEL_DIR));

        Self {
            ram_model_dir,
            explanation: ExplanationConfig::from_lookup(&lookup),
            bind_addr: bind_addr(&lookup, DEFAULT_TAG_PORT),
        }
    }
}

fn bind_addr<F>(lookup: &F, default_port: u16) -> SocketAddr
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = lookup("PORT")
        .and_then(|v| v.trim().parse::<u16>().ok())
        .unwrap_or(default_port);

    format!("{}:{}", host.trim(), port)
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)))
}
