//! Historical insight for a birth date.
//!
//! The insight is decorative: every failure collapses into
//! [`InsightUnavailable`] and the caller shows a placeholder instead.

mod gemini;

use std::future::Future;

use anyhow::Result;
use chrono::NaiveDate;
use thiserror::Error;

use crate::config::InsightConfig;

pub use gemini::GeminiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insights unavailable")]
pub struct InsightUnavailable;

/// A one-shot text generation backend.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;

    /// `false` when generation is switched off by configuration; callers
    /// then skip the request entirely.
    fn is_available(&self) -> bool {
        true
    }
}

/// The generator selected from configuration.
pub enum ActiveGenerator {
    Gemini(GeminiClient),
    Disabled,
}

impl ActiveGenerator {
    pub fn from_config(config: &InsightConfig) -> Self {
        if config.usable_api_key().is_none() {
            tracing::info!(
                enabled = config.enabled,
                "historical insights disabled (no API key or --no-insight)"
            );
            return Self::Disabled;
        }

        match GeminiClient::new(config) {
            Ok(client) => {
                tracing::debug!(url = client.url(), "historical insights enabled");
                Self::Gemini(client)
            }
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "failed to create Gemini client");
                Self::Disabled
            }
        }
    }
}

impl TextGenerator for ActiveGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            ActiveGenerator::Gemini(client) => client.generate(prompt).await,
            ActiveGenerator::Disabled => Err(anyhow::anyhow!("historical insights are disabled")),
        }
    }

    fn is_available(&self) -> bool {
        matches!(self, ActiveGenerator::Gemini(_))
    }
}

/// Natural-language prompt asking for a fact about `date`.
pub fn build_prompt(date: NaiveDate) -> String {
    format!(
        "Someone was born on {}. Share one interesting, verifiable historical event \
         that happened on {} (any year), in two or three sentences. \
         Reply with plain text only, no markdown or headings.",
        date.format("%A, %B %-d, %Y"),
        date.format("%B %-d"),
    )
}

/// Fetches the insight text for `date`; one attempt, no retry.
pub async fn fetch_historical_insight<G: TextGenerator>(
    generator: &G,
    date: NaiveDate,
) -> Result<String, InsightUnavailable> {
    let prompt = build_prompt(date);

    match generator.generate(&prompt).await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                tracing::warn!(%date, "text generator returned an empty insight");
                return Err(InsightUnavailable);
            }
            Ok(text.to_string())
        }
        Err(error) => {
            tracing::warn!(%date, error = %format!("{error:#}"), "historical insight unavailable");
            Err(InsightUnavailable)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::Result;

    use super::TextGenerator;

    /// Replays canned responses and records every prompt it receives.
    pub(crate) struct MockGenerator {
        responses: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        pub(crate) fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for MockGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("mock responses exhausted")))
        }
    }
}
