// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Explanation client for scan results via an OpenAI-compatible chat API
//!
//! The explanation is advisory. Every failure (transport, timeout, status,
//! malformed body, empty content) is logged and collapses to `None`.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ExplanationConfig;
use crate::scan::Label;

/// Bound on the whole explanation call
pub const EXPLANATION_TIMEOUT: Duration = Duration::from_secs(15);

const EXPLANATION_MODEL: &str = "deepseek-chat";
const EXPLANATION_MAX_TOKENS: u32 = 200;

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Short user-facing text for a scan outcome
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    /// `image_base64` is the raw base64 payload without a data-URI prefix
    async fn explain(&self, label: Label, confidence: f32, image_base64: &str) -> Option<String>;
}

/// Prompt sent with every explanation request
pub fn explanation_prompt(label: Label, confidence: f32) -> String {
    format!(
        "Our image classifier returned: {} (confidence {:.0}%). \
         Write one short, reassuring paragraph for the user. \
         Emphasise this is indicative only and they should see a professional for confirmation. \
         Keep it under 3 sentences. Do not diagnose.",
        label,
        confidence * 100.0
    )
}

/// Client for the explanation provider
pub struct ExplanationClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ExplanationClient {
    /// Create a new explanation client
    pub fn new(api_base: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(api_base, api_key, EXPLANATION_TIMEOUT)
    }

    pub fn with_timeout(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = api_base.trim_end_matches('/').to_string();
        info!("Explanation client configured: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    /// Build a client only when a credential is configured
    pub fn from_config(config: &ExplanationConfig) -> Result<Option<Self>> {
        match config.api_key.as_deref() {
            Some(key) => Ok(Some(Self::new(&config.api_base, key)?)),
            None => {
                info!("No explanation API key configured, explanations disabled");
                Ok(None)
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(label: Label, confidence: f32, image_base64: &str) -> ChatRequest {
        let data_url = format!("data:image/jpeg;base64,{}", image_base64);
        ChatRequest {
            model: EXPLANATION_MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    {"type": "text", "text": explanation_prompt(label, confidence)},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            max_tokens: EXPLANATION_MAX_TOKENS,
        }
    }

    async fn request_explanation(
        &self,
        label: Label,
        confidence: f32,
        image_base64: &str,
    ) -> Result<Option<String>> {
        let request = Self::build_request(label, confidence, image_base64);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

#[async_trait]
impl ExplanationProvider for ExplanationClient {
    async fn explain(&self, label: Label, confidence: f32, image_base64: &str) -> Option<String> {
        match self.request_explanation(label, confidence, image_base64).await {
            Ok(Some(text)) => {
                debug!("Explanation received: {} chars", text.len());
                Some(text)
            }
            Ok(None) => {
                warn!("Explanation provider returned no content");
                None
            }
            Err(e) => {
                warn!("Explanation request failed: {}", e);
                None
            }
        }
    }
}
