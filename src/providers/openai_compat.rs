//! OpenAI-compatible API provider.
//!
//! Talks to any endpoint implementing the OpenAI chat completions format
//! (Gemini's OpenAI-compat surface, OpenRouter, OpenAI, vLLM, ...).
//! HTTP and payload failures are reported as typed [`ProviderError`] values
//! so the resilient client can decide what is worth retrying.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::base::{LLMProvider, LLMResponse, ToolCallRequest};
use crate::errors::ProviderError;

/// A model provider that talks to any OpenAI-compatible chat completions endpoint.
pub struct OpenAICompatProvider {
    api_key: String,
    api_base: String,
    default_model: String,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a new provider.
    ///
    /// `api_base` is the URL prefix up to (not including) `/chat/completions`;
    /// a trailing slash is tolerated.
    pub fn new(api_key: &str, api_base: &str, default_model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model: default_model.to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    async fn chat(
        &self,
        messages: &[serde_json::Value],
        tools: Option<&[serde_json::Value]>,
        model: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<LLMResponse> {
        let model = model.unwrap_or(&self.default_model);

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        if let Some(tool_defs) = tools {
            if !tool_defs.is_empty() {
                body["tools"] = serde_json::json!(tool_defs);
                body["tool_choice"] = serde_json::json!("auto");
            }
        }

        debug!(model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            let text = response.text().await.unwrap_or_default();
            warn!("model API returned status {} (base={})", status, self.api_base);

            let err = match status.as_u16() {
                401 | 403 => ProviderError::AuthError {
                    status: status.as_u16(),
                    message: text,
                },
                429 => ProviderError::RateLimited {
                    status: status.as_u16(),
                    retry_after_ms,
                },
                _ => ProviderError::ServerError {
                    status: status.as_u16(),
                    message: text,
                },
            };
            return Err(err.into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::ResponseReadError(e.to_string()))?;

        let data: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::JsonParseError(e.to_string()))?;

        parse_response(&data)
    }

    fn get_default_model(&self) -> &str {
        &self.default_model
    }
}

/// Parse the OpenAI-compatible JSON response into an [`LLMResponse`].
fn parse_response(data: &serde_json::Value) -> Result<LLMResponse> {
    let choice = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| ProviderError::JsonParseError("no choices in response".to_string()))?;

    let message = choice.get("message").cloned().unwrap_or_default();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    let mut tool_calls = Vec::new();
    if let Some(tc_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_array {
            let id = tc
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let function = tc.get("function").cloned().unwrap_or_default();
            let name = function
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            // Arguments come as a JSON string that we need to parse.
            let arguments: HashMap<String, serde_json::Value> = match function.get("arguments") {
                Some(serde_json::Value::String(s)) => {
                    serde_json::from_str(s).unwrap_or_default()
                }
                Some(serde_json::Value::Object(map)) => map.clone().into_iter().collect(),
                _ => HashMap::new(),
            };

            if !name.is_empty() {
                tool_calls.push(ToolCallRequest {
                    id,
                    name,
                    arguments,
                });
            }
        }
    }

    let mut usage = HashMap::new();
    if let Some(u) = data.get("usage").and_then(|v| v.as_object()) {
        for (k, v) in u {
            if let Some(n) = v.as_i64() {
                usage.insert(k.clone(), n);
            }
        }
    }

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
        usage,
    })
}
