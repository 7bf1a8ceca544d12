//! Gemini LLM client
//!
//! Thin REST client for narrative generation. Every failure path returns
//! `None` so callers fall back to deterministic output.

use arandu_common::config::LlmConfig;
use serde_json::json;
use std::time::Duration;
use tracing::{error, warn};

/// Gemini API client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    enabled: bool,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            enabled: config.enabled,
        }
    }

    /// Build a client only when LLM features are usable
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.enabled || config.api_key.is_empty() {
            return None;
        }
        Some(Self::new(config))
    }

    /// Generate text for a prompt. Returns `None` when disabled or on any
    /// API failure.
    pub async fn generate_text(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Option<String> {
        if !self.enabled || self.api_key.is_empty() {
            warn!("LLM disabled or unconfigured");
            return None;
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        let response = match self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "LLM request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            error!(status = %response.status(), "LLM generation failed");
            return None;
        }

        let data: serde_json::Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "LLM response parse failed");
                return None;
            }
        };

        data.get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
    }

    /// Generate structured JSON output. Strips markdown code fences before
    /// parsing; malformed JSON returns `None`.
    pub async fn generate_structured(&self, prompt: &str) -> Option<serde_json::Value> {
        let text = self.generate_text(prompt, 0.2, 2000).await?;
        parse_json_response(&text)
    }
}

/// Strip ```json fences and parse
pub fn parse_json_response(text: &str) -> Option<serde_json::Value> {
    let mut text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }

    match serde_json::from_str(text.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(error = %e, "Failed to parse LLM JSON output");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let parsed = parse_json_response("{\"a\": 1}").unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn test_parse_fenced_json() {
        let parsed = parse_json_response("```json\n{\"a\": [1, 2]}\n```").unwrap();
        assert_eq!(parsed["a"][1], 2);
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_json_response("not json at all").is_none());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = LlmConfig { enabled: true, api_key: String::new(), model: "m".into() };
        assert!(GeminiClient::from_config(&config).is_none());

        let config = LlmConfig { enabled: false, api_key: "k".into(), model: "m".into() };
        assert!(GeminiClient::from_config(&config).is_none());

        let config = LlmConfig { enabled: true, api_key: "k".into(), model: "m".into() };
        assert!(GeminiClient::from_config(&config).is_some());
    }
}
