//! Resilient model client: retry, backoff, and empty-response rejection.
//!
//! The orchestrator never retries model calls itself; this client owns the
//! whole retry budget so backoff layers cannot stack.

use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use serde_json::Value;
use tracing::warn;

use super::base::{LLMProvider, LLMResponse};
use super::retry::{adjust_for_rate_limit, RetryPolicy};
use crate::errors::{ProviderError, RunError};

/// Wraps an [`LLMProvider`] with a per-call timeout and a bounded randomized
/// exponential backoff. A completion with no tool calls and empty or
/// whitespace-only content is treated the same as a transport failure.
pub struct ResilientClient {
    provider: Arc<dyn LLMProvider>,
    policy: RetryPolicy,
    model: Option<String>,
    max_tokens: u32,
    temperature: f64,
    call_timeout: Duration,
}

impl ResilientClient {
    pub fn new(provider: Arc<dyn LLMProvider>, policy: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            provider,
            policy,
            model: None,
            max_tokens: 4096,
            temperature: 0.7,
            call_timeout,
        }
    }

    /// Override the provider's default model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// One transport attempt: timeout-bounded chat call plus the
    /// degenerate-response check.
    async fn attempt(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
    ) -> anyhow::Result<LLMResponse> {
        let fut = self.provider.chat(
            messages,
            tools,
            self.model.as_deref(),
            self.max_tokens,
            self.temperature,
        );
        let response = match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(self.call_timeout.as_secs()).into()),
        };

        if response.is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }
        Ok(response)
    }

    /// Obtain the next action message, retrying transient failures.
    ///
    /// Returns the response unchanged on success, including plain-text
    /// responses with zero tool calls. Fails with
    /// [`RunError::ModelUnavailable`] once the policy is exhausted.
    pub async fn complete(
        &self,
        messages: &[Value],
        tools: Option<&[Value]>,
    ) -> Result<LLMResponse, RunError> {
        let op = || self.attempt(messages, tools);

        op.retry(self.policy.backoff())
            .when(|e: &anyhow::Error| match e.downcast_ref::<ProviderError>() {
                Some(pe) => pe.is_retryable(),
                // Errors without a typed classification are assumed transient.
                None => true,
            })
            .adjust(adjust_for_rate_limit)
            .notify(|e: &anyhow::Error, dur: Duration| {
                warn!("model call failed ({}), retrying in {:?}", e, dur);
            })
            .await
            .map_err(|e| RunError::ModelUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(2),
        )
    }

    fn text_response(content: &str) -> LLMResponse {
        LLMResponse {
            content: Some(content.to_string()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        }
    }

    /// Returns empty content for the first `empty_calls` calls, then valid text.
    struct FlakyProvider {
        calls: AtomicU32,
        empty_calls: u32,
    }

    #[async_trait]
    impl LLMProvider for FlakyProvider {
        async fn chat(
            &self,
            _messages: &[Value],
            _tools: Option<&[Value]>,
            _model: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
        ) -> anyhow::Result<LLMResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.empty_calls {
                Ok(text_response("   "))
            } else {
                Ok(text_response("next action: look up rates"))
            }
        }

        fn get_default_model(&self) -> &str {
            "mock-model"
        }
    }

    struct AuthFailProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LLMProvider for AuthFailProvider {
        async fn chat(
            &self,
            _messages: &[Value],
            _tools: Option<&[Value]>,
            _model: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
        ) -> anyhow::Result<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::AuthError {
                status: 401,
                message: "bad key".to_string(),
            }
            .into())
        }

        fn get_default_model(&self) -> &str {
            "mock-model"
        }
    }

    struct SlowProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LLMProvider for SlowProvider {
        async fn chat(
            &self,
            _messages: &[Value],
            _tools: Option<&[Value]>,
            _model: Option<&str>,
            _max_tokens: u32,
            _temperature: f64,
        ) -> anyhow::Result<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(text_response("too late"))
        }

        fn get_default_model(&self) -> &str {
            "mock-model"
        }
    }

    #[tokio::test]
    async fn test_empty_then_valid_succeeds() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            empty_calls: 2,
        });
        let client = ResilientClient::new(
            provider.clone(),
            fast_policy(6),
            Duration::from_secs(5),
        );

        let resp = client.complete(&[], None).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("next action: look up rates"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_always_empty_exhausts_exactly_max_attempts() {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            empty_calls: u32::MAX,
        });
        let client = ResilientClient::new(
            provider.clone(),
            fast_policy(3),
            Duration::from_secs(5),
        );

        let err = client.complete(&[], None).await.unwrap_err();
        assert!(matches!(err, RunError::ModelUnavailable(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auth_error_not_retried() {
        let provider = Arc::new(AuthFailProvider {
            calls: AtomicU32::new(0),
        });
        let client = ResilientClient::new(
            provider.clone(),
            fast_policy(6),
            Duration::from_secs(5),
        );

        let err = client.complete(&[], None).await.unwrap_err();
        assert!(matches!(err, RunError::ModelUnavailable(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_fatal() {
        let provider = Arc::new(SlowProvider {
            calls: AtomicU32::new(0),
        });
        let client = ResilientClient::new(
            provider.clone(),
            fast_policy(2),
            Duration::from_millis(10),
        );

        let err = client.complete(&[], None).await.unwrap_err();
        assert!(matches!(err, RunError::ModelUnavailable(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tool_calls_without_content_not_retried() {
        struct ToolCallProvider {
            calls: AtomicU32,
        }

        #[async_trait]
        impl LLMProvider for ToolCallProvider {
            async fn chat(
                &self,
                _messages: &[Value],
                _tools: Option<&[Value]>,
                _model: Option<&str>,
                _max_tokens: u32,
                _temperature: f64,
            ) -> anyhow::Result<LLMResponse> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(LLMResponse {
                    content: None,
                    tool_calls: vec![crate::providers::base::ToolCallRequest {
                        id: "call_1".to_string(),
                        name: "final_answer".to_string(),
                        arguments: HashMap::new(),
                    }],
                    finish_reason: "tool_calls".to_string(),
                    usage: HashMap::new(),
                })
            }

            fn get_default_model(&self) -> &str {
                "mock-model"
            }
        }

        let provider = Arc::new(ToolCallProvider {
            calls: AtomicU32::new(0),
        });
        let client = ResilientClient::new(
            provider.clone(),
            fast_policy(6),
            Duration::from_secs(5),
        );

        let resp = client.complete(&[], None).await.unwrap();
        assert!(resp.has_tool_calls());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
