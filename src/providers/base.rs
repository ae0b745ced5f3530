//! Base model provider interface.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool call request from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCallRequest {
    /// Convert to OpenAI function-call JSON format.
    pub fn to_openai_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": serde_json::to_string(&self.arguments)
                    .unwrap_or_else(|_| "{}".to_string()),
            }
        })
    }
}

/// Response from a model provider.
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: String,
    pub usage: HashMap<String, i64>,
}

impl LLMResponse {
    /// Check if response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// True when the model produced neither visible text nor tool calls.
    ///
    /// Whitespace-only content counts as empty. The resilient client treats
    /// this as a transient failure and retries.
    pub fn is_empty(&self) -> bool {
        !self.has_tool_calls()
            && self
                .content
                .as_deref()
                .map(|c| c.trim().is_empty())
                .unwrap_or(true)
    }
}

/// Abstract base trait for model providers.
///
/// Implementations handle the specifics of each provider's API while
/// maintaining a consistent interface. Errors are reported as typed
/// [`crate::errors::ProviderError`] values embedded in `anyhow::Error`.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` - List of message objects with `role` and `content`.
    /// * `tools` - Optional list of tool definitions in OpenAI format.
    /// * `model` - Model identifier (provider-specific); `None` uses the default.
    /// * `max_tokens` - Maximum tokens in response.
    /// * `temperature` - Sampling temperature.
    async fn chat(
        &self,
        messages: &[serde_json::Value],
        tools: Option<&[serde_json::Value]>,
        model: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<LLMResponse>;

    /// Get the default model for this provider.
    fn get_default_model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content: Option<&str>, tool_calls: Vec<ToolCallRequest>) -> LLMResponse {
        LLMResponse {
            content: content.map(String::from),
            tool_calls,
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        }
    }

    #[test]
    fn test_is_empty_none_content() {
        assert!(response(None, vec![]).is_empty());
    }

    #[test]
    fn test_is_empty_whitespace_content() {
        assert!(response(Some("   \n\t "), vec![]).is_empty());
    }

    #[test]
    fn test_not_empty_with_text() {
        assert!(!response(Some("thinking about it"), vec![]).is_empty());
    }

    #[test]
    fn test_not_empty_with_tool_calls_only() {
        let tc = ToolCallRequest {
            id: "call_1".to_string(),
            name: "calculate_distance".to_string(),
            arguments: HashMap::new(),
        };
        assert!(!response(None, vec![tc]).is_empty());
    }

    #[test]
    fn test_to_openai_json_shape() {
        let mut args = HashMap::new();
        args.insert("query".to_string(), serde_json::json!("ports in Rotterdam"));
        let tc = ToolCallRequest {
            id: "call_9".to_string(),
            name: "search_places".to_string(),
            arguments: args,
        };
        let json = tc.to_openai_json();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "search_places");
        // Arguments are encoded as a JSON string, matching the wire format.
        let encoded = json["function"]["arguments"].as_str().unwrap();
        assert!(encoded.contains("Rotterdam"));
    }
}
