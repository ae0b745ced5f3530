//! Python snippet execution tool.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use super::base::{require_str, Tool, ToolOutcome};
use crate::errors::ToolErrorKind;

/// Cap on captured stdout/stderr returned to the model.
const MAX_OUTPUT_CHARS: usize = 10_000;

/// Run short Python snippets in a subprocess with a wall-clock timeout.
pub struct CodeExecutionTool {
    timeout: Duration,
    interpreter: String,
}

impl CodeExecutionTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interpreter: "python3".to_string(),
        }
    }
}

fn truncate_output(text: &str) -> String {
    if text.len() <= MAX_OUTPUT_CHARS {
        return text.to_string();
    }
    let mut end = MAX_OUTPUT_CHARS;
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}\n... (output truncated)", &text[..end])
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn name(&self) -> &str {
        "run_python"
    }

    fn description(&self) -> &str {
        "Execute a short Python snippet and return its stdout. Useful for calculations and data wrangling."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome {
        let code = match require_str(&args, "code") {
            Ok(c) => c.to_string(),
            Err(kind) => return ToolOutcome::failure(kind),
        };

        let mut child = match Command::new(&self.interpreter)
            .arg("-c")
            .arg(&code)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                return ToolOutcome::failure(ToolErrorKind::ExecutionFailed(format!(
                    "failed to start {}: {}",
                    self.interpreter, e
                )));
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                return ToolOutcome::failure(ToolErrorKind::ExecutionFailed(format!(
                    "failed to collect output: {}",
                    e
                )));
            }
            Err(_) => {
                return ToolOutcome::failure(ToolErrorKind::Timeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return ToolOutcome::failure(ToolErrorKind::ExecutionFailed(format!(
                "exit status {}: {}",
                output.status.code().unwrap_or(-1),
                truncate_output(stderr.trim())
            )));
        }

        let mut result = truncate_output(stdout.trim());
        if result.is_empty() && !stderr.trim().is_empty() {
            result = truncate_output(stderr.trim());
        }
        if result.is_empty() {
            result = "(no output)".to_string();
        }
        ToolOutcome::success(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code_args(code: &str) -> HashMap<String, serde_json::Value> {
        let mut m = HashMap::new();
        m.insert("code".to_string(), json!(code));
        m
    }

    #[tokio::test]
    async fn test_prints_stdout() {
        let tool = CodeExecutionTool::new(Duration::from_secs(10));
        let result = tool.invoke(code_args("print(6371 * 2)")).await;
        assert!(result.ok);
        assert_eq!(result.data, "12742");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_execution_failed() {
        let tool = CodeExecutionTool::new(Duration::from_secs(10));
        let result = tool.invoke(code_args("import sys; sys.exit(3)")).await;
        assert!(!result.ok);
        assert!(matches!(
            result.error_kind,
            Some(ToolErrorKind::ExecutionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let tool = CodeExecutionTool::new(Duration::from_millis(200));
        let result = tool
            .invoke(code_args("import time; time.sleep(30)"))
            .await;
        assert!(!result.ok);
        assert!(matches!(result.error_kind, Some(ToolErrorKind::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_code_is_invalid_arguments() {
        let tool = CodeExecutionTool::new(Duration::from_secs(10));
        let result = tool.invoke(HashMap::new()).await;
        assert!(!result.ok);
        assert!(matches!(
            result.error_kind,
            Some(ToolErrorKind::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_output_placeholder() {
        let tool = CodeExecutionTool::new(Duration::from_secs(10));
        let result = tool.invoke(code_args("pass")).await;
        assert!(result.ok);
        assert_eq!(result.data, "(no output)");
    }
}
