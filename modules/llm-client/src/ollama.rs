//! Ollama client for locally hosted models, via the /api/generate endpoint.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::ChatCompletion;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct Ollama {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl Ollama {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }
}

#[async_trait]
impl ChatCompletion for Ollama {
    async fn chat_completion(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        // /api/generate takes one prompt string; fold the system preamble in.
        let prompt = if system.is_empty() {
            user.to_string()
        } else {
            format!("{system}\n\n{user}")
        };

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };

        debug!(model = %self.model, "Ollama generate request");

        let response = self.http.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama API error ({status}): {error_text}"));
        }

        let generate_response: GenerateResponse = response.json().await?;
        let content = generate_response.response.trim().to_string();
        if content.is_empty() {
            return Err(anyhow!("Empty response from Ollama"));
        }
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
