//! Domain error types for cargoscout.
//!
//! Typed errors at module boundaries replace string-encoded errors and
//! enable structured error handling via pattern matching.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Errors from model provider operations.
///
/// Embedded in `anyhow::Error` so the `LLMProvider` trait signature
/// (`-> anyhow::Result<LLMResponse>`) stays unchanged while callers
/// can downcast: `e.downcast_ref::<ProviderError>()`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to read response body: {0}")]
    ResponseReadError(String),

    #[error("Failed to parse response JSON: {0}")]
    JsonParseError(String),

    #[error("Rate limited (status {status}): retry after {retry_after_ms}ms")]
    RateLimited { status: u16, retry_after_ms: u64 },

    #[error("Authentication failed (status {status}): {message}")]
    AuthError { status: u16, message: String },

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Model returned empty content with no tool calls")]
    EmptyResponse,

    #[error("Model call timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether a failed call may succeed on a later attempt.
    ///
    /// Auth failures and unparseable-request-class errors are permanent;
    /// everything transport-shaped (including the degenerate empty
    /// completion) is worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::AuthError { .. })
    }
}

// ---------------------------------------------------------------------------
// Tool error classification
// ---------------------------------------------------------------------------

/// Categorised tool failure reasons.
///
/// Concrete tools construct these directly; [`classify_tool_error`] is the
/// fallback for plain `"Error: ..."` strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolErrorKind {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Classify a tool error string into a structured [`ToolErrorKind`].
///
/// Matches on known substrings in the error message. Returns `None` for
/// unrecognised patterns (the caller still has the raw string).
pub fn classify_tool_error(error_msg: &str) -> Option<ToolErrorKind> {
    let lower = error_msg.to_lowercase();

    if lower.contains("timed out") || lower.contains("timeout") {
        let secs = extract_timeout_secs(&lower).unwrap_or(0);
        return Some(ToolErrorKind::Timeout(secs));
    }

    if lower.contains("unknown tool") || lower.contains("tool not found") {
        return Some(ToolErrorKind::ToolNotFound(error_msg.to_string()));
    }

    if lower.contains("unreachable")
        || lower.contains("returned http")
        || lower.contains("connection")
    {
        return Some(ToolErrorKind::UpstreamUnavailable(error_msg.to_string()));
    }

    if lower.contains("malformed") || lower.contains("missing field") {
        return Some(ToolErrorKind::MalformedResponse(error_msg.to_string()));
    }

    if lower.contains("invalid")
        || lower.contains("missing required")
        || lower.contains("out of range")
    {
        return Some(ToolErrorKind::InvalidArguments(error_msg.to_string()));
    }

    None
}

/// Try to extract a numeric timeout value from an error message.
fn extract_timeout_secs(msg: &str) -> Option<u64> {
    let patterns = ["after ", "timeout "];
    for pat in &patterns {
        if let Some(pos) = msg.find(pat) {
            let after = &msg[pos + pat.len()..];
            let num_str: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(n) = num_str.parse::<u64>() {
                return Some(n);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Run errors
// ---------------------------------------------------------------------------

/// Terminal failures for one agent run.
///
/// Tool-level failures never appear here: they are folded back into the
/// conversation as data. Only these three conditions end a run without a
/// final answer, and callers can always tell them apart.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Model unavailable after exhausting retries: {0}")]
    ModelUnavailable(String),

    #[error("Step budget exhausted after {steps} steps without a final answer")]
    BudgetExhausted { steps: u32 },

    #[error("Run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let e = ProviderError::HttpError("connection refused".into());
        assert_eq!(e.to_string(), "HTTP request failed: connection refused");
    }

    #[test]
    fn test_provider_error_downcast() {
        let anyhow_err: anyhow::Error = ProviderError::AuthError {
            status: 401,
            message: "invalid key".into(),
        }
        .into();
        let downcasted = anyhow_err.downcast_ref::<ProviderError>();
        assert!(downcasted.is_some());
        assert!(matches!(
            downcasted.unwrap(),
            ProviderError::AuthError { status: 401, .. }
        ));
    }

    #[test]
    fn test_auth_error_not_retryable() {
        let e = ProviderError::AuthError {
            status: 401,
            message: "bad key".into(),
        };
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_transient_errors_retryable() {
        assert!(ProviderError::EmptyResponse.is_retryable());
        assert!(ProviderError::Timeout(30).is_retryable());
        assert!(ProviderError::RateLimited {
            status: 429,
            retry_after_ms: 1000
        }
        .is_retryable());
        assert!(ProviderError::ServerError {
            status: 503,
            message: "overloaded".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_classify_timeout() {
        let kind = classify_tool_error("Request timed out after 30 seconds");
        assert_eq!(kind, Some(ToolErrorKind::Timeout(30)));
    }

    #[test]
    fn test_classify_invalid_args() {
        let kind = classify_tool_error("Invalid latitude: out of range");
        assert!(matches!(kind, Some(ToolErrorKind::InvalidArguments(_))));
    }

    #[test]
    fn test_classify_upstream() {
        let kind = classify_tool_error("Provider returned HTTP 503");
        assert!(matches!(kind, Some(ToolErrorKind::UpstreamUnavailable(_))));
    }

    #[test]
    fn test_classify_malformed() {
        let kind = classify_tool_error("Malformed payload: missing field 'places'");
        assert!(matches!(kind, Some(ToolErrorKind::MalformedResponse(_))));
    }

    #[test]
    fn test_classify_tool_not_found() {
        let kind = classify_tool_error("Unknown tool: magic_wand");
        assert!(matches!(kind, Some(ToolErrorKind::ToolNotFound(_))));
    }

    #[test]
    fn test_classify_unrecognised() {
        assert_eq!(classify_tool_error("something odd happened"), None);
    }

    #[test]
    fn test_run_error_variants_distinct() {
        let budget = RunError::BudgetExhausted { steps: 20 };
        let model = RunError::ModelUnavailable("gone".into());
        assert!(budget.to_string().contains("20 steps"));
        assert!(model.to_string().contains("retries"));
        assert!(!budget.to_string().contains("retries"));
    }
}
