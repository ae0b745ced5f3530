//! Terminal answer tool.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use super::base::{Tool, ToolOutcome};
use crate::errors::ToolErrorKind;

/// Name the orchestrator watches for to end a run.
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Passes the answer payload through unchanged. Calling this tool is the
/// sole terminal success signal the orchestrator recognizes.
pub struct FinalAnswerTool;

#[async_trait]
impl Tool for FinalAnswerTool {
    fn name(&self) -> &str {
        FINAL_ANSWER_TOOL
    }

    fn description(&self) -> &str {
        "Provide the final answer to the task. Call this exactly once, when the task is complete."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "answer": {
                    "description": "The final answer. May be a string or any structured value."
                }
            },
            "required": ["answer"]
        })
    }

    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome {
        let answer = match args.get("answer") {
            Some(v) => v,
            None => {
                return ToolOutcome::failure(ToolErrorKind::InvalidArguments(
                    "missing required 'answer'".to_string(),
                ));
            }
        };

        let rendered = match answer {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ToolOutcome::success(rendered)
    }
}
