//! Base trait for agent tools.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::{classify_tool_error, ToolErrorKind};

/// Structured outcome for a tool invocation.
///
/// Failures are values, not panics or propagated errors: the orchestrator
/// folds them back into the conversation so the model can react.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub ok: bool,
    /// What the model sees. On failure this carries the `Error:` prefix.
    pub data: String,
    pub error: Option<String>,
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolOutcome {
    pub fn success(data: String) -> Self {
        Self {
            ok: true,
            data,
            error: None,
            error_kind: None,
        }
    }

    /// Failure with an explicit classification.
    pub fn failure(kind: ToolErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            ok: false,
            data: format!("Error: {}", message),
            error: Some(message),
            error_kind: Some(kind),
        }
    }

    /// Failure from a raw message; classification is best-effort.
    pub fn failure_msg(message: String) -> Self {
        let error_kind = classify_tool_error(&message);
        Self {
            ok: false,
            data: format!("Error: {}", message),
            error: Some(message),
            error_kind,
        }
    }
}

/// Abstract base trait for agent tools.
///
/// Tools are the capabilities the model can call: distance computation,
/// rate lookups, searches, and the terminal `final_answer`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls. Unique within a registry.
    fn name(&self) -> &str;

    /// Description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for tool parameters. Pure; no side effects.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with given arguments.
    ///
    /// Implementations must validate arguments against their schema before
    /// performing any side effect, and must report failures through the
    /// returned [`ToolOutcome`] rather than panicking.
    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome;

    /// Convert tool to OpenAI function schema format.
    fn to_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

/// Read a required f64 argument, accepting integer JSON numbers too.
pub(crate) fn require_f64(
    args: &HashMap<String, serde_json::Value>,
    name: &str,
) -> Result<f64, ToolErrorKind> {
    args.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| {
            ToolErrorKind::InvalidArguments(format!("missing required number '{}'", name))
        })
}

/// Read an optional f64 argument with a default.
pub(crate) fn optional_f64(
    args: &HashMap<String, serde_json::Value>,
    name: &str,
    default: f64,
) -> Result<f64, ToolErrorKind> {
    match args.get(name) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| {
            ToolErrorKind::InvalidArguments(format!("'{}' must be a number", name))
        }),
    }
}

/// Read a required string argument.
pub(crate) fn require_str<'a>(
    args: &'a HashMap<String, serde_json::Value>,
    name: &str,
) -> Result<&'a str, ToolErrorKind> {
    args.get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ToolErrorKind::InvalidArguments(format!("missing required string '{}'", name))
        })
}
