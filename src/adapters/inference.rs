//! HTTP client for a hosted text-generation router.
//!
//! Sends one prompt per request with low temperature configured for stable
//! planning output. There is no retry loop and no timeout at this layer;
//! a failed or malformed response is reported once to the caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::TextGenerator;

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co";
const DEFAULT_MODEL: &str = "google/flan-t5-large";

/// Client for the hosted inference endpoint
pub struct InferenceClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

/// Response item in the `[{"generated_text": ...}]` shape
#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl InferenceClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the endpoint base (used against local inference servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }

    /// The endpoint returns one of three shapes depending on the hosted
    /// model: a bare string, a list of generated_text objects, or a single
    /// generated_text object.
    fn extract_text(body: &str) -> Result<String> {
        if let Ok(items) = serde_json::from_str::<Vec<GeneratedText>>(body) {
            if let Some(first) = items.into_iter().next() {
                return Ok(first.generated_text);
            }
        }
        if let Ok(item) = serde_json::from_str::<GeneratedText>(body) {
            return Ok(item.generated_text);
        }
        if let Ok(text) = serde_json::from_str::<String>(body) {
            return Ok(text);
        }
        anyhow::bail!("unrecognized inference response shape: {}", body)
    }
}

#[async_trait]
impl TextGenerator for InferenceClient {
    fn name(&self) -> &str {
        "inference"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "inputs": prompt,
                "parameters": {
                    "max_new_tokens": 1000,
                    "temperature": 0.3,
                    "return_full_text": false,
                },
            }))
            .send()
            .await
            .context("Failed to reach inference endpoint")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read inference response")?;

        if !status.is_success() {
            anyhow::bail!("Inference endpoint returned {}: {}", status, body.trim());
        }

        Self::extract_text(&body)
    }
}
