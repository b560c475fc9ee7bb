//! Extraction capability: any provider speaking the prompt contract.

use super::prompt::{build_user_prompt, parse_extraction, ExtractionOutput, SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::{PricingError, PricingResult};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turns page content into structured plans.
#[async_trait]
pub trait PlanExtractor: Send + Sync {
    /// Run one extraction pass over `content` taken from `source_url`.
    async fn extract(&self, content: &str, source_url: &str) -> PricingResult<ExtractionOutput>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiExtractor {
    client: reqwest::Client,
    config: LlmConfig,
    max_content_chars: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl OpenAiExtractor {
    pub fn new(config: &LlmConfig, max_content_chars: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build LLM client")?;
        Ok(Self {
            client,
            config: config.clone(),
            max_content_chars,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl PlanExtractor for OpenAiExtractor {
    async fn extract(&self, content: &str, source_url: &str) -> PricingResult<ExtractionOutput> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| PricingError::ExtractionFailed("LLM API key not configured".into()))?;

        let user_prompt = build_user_prompt(source_url, content, self.max_content_chars);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            "extraction call: model={} content_chars={}",
            self.config.model,
            content.chars().count()
        );

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PricingError::ExtractionFailed(format!("LLM request failed: {e}")))?;

        let status = resp.status();
        let body: ChatResponse = resp.json().await.map_err(|e| {
            PricingError::ExtractionFailed(format!("invalid LLM response (HTTP {status}): {e}"))
        })?;

        if let Some(err) = body.error.filter(|e| !e.message.is_empty()) {
            return Err(PricingError::ExtractionFailed(format!(
                "LLM error: {}",
                err.message
            )));
        }
        if !status.is_success() {
            return Err(PricingError::ExtractionFailed(format!(
                "LLM returned HTTP {status}"
            )));
        }

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PricingError::ExtractionFailed("no response from LLM".into()))?;

        parse_extraction(&text)
    }
}
