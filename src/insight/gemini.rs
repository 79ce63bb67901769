use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::TextGenerator;
use crate::config::InsightConfig;

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    api_key: Arc<String>,
    http: Arc<Client>,
    url: Arc<String>,
}

impl GeminiClient {
    /// Create a Gemini `generateContent` client from the insight settings.
    pub fn new(config: &InsightConfig) -> Result<Self> {
        let api_key = config
            .usable_api_key()
            .context("GEMINI_API_KEY environment variable not set")?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("chronos/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            api_key: Arc::new(api_key.to_string()),
            http: Arc::new(http),
            url: Arc::new(url),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single `generateContent` request; service-side `error` payloads and
    /// non-2xx statuses are errors.
    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url.as_str())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }));

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Network error sending generateContent request: {e}"))?;

        let status = resp.status();

        // Parse JSON (even for non-2xx to capture error payloads)
        let json: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse JSON from Gemini: {e}"))?;

        if let Some(error) = json.get("error") {
            return Err(anyhow::anyhow!("Gemini reported an error: {error:#}"));
        }

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Gemini API returned HTTP {}: {json:#}",
                status.as_u16()
            ));
        }

        extract_text(json)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(url = %self.url, "requesting historical insight");
        self.generate_content(prompt).await
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(json: Value) -> Result<String> {
    let parsed: GenerateResponse =
        serde_json::from_value(json).context("Failed to deserialize generateContent response")?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(anyhow::anyhow!("Prompt blocked by Gemini: {reason}"));
    }

    let candidate = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| anyhow::anyhow!("Gemini response contained no candidates"))?;

    let finish_reason = candidate.finish_reason;
    let mut text = String::new();
    if let Some(content) = candidate.content {
        if let Some(parts) = content.parts {
            for part in parts {
                if let Some(t) = part.text {
                    text.push_str(&t);
                }
            }
        }
    }

    if text.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "Gemini candidate had no text (finishReason: {})",
            finish_reason.as_deref().unwrap_or("unknown")
        ));
    }

    Ok(text)
}
