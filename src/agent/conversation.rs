//! Append-only conversation state for one run.

use serde_json::{json, Value};

use crate::agent::tools::ToolOutcome;
use crate::providers::LLMResponse;

/// Prompt injected every `planning_interval` steps to make the model reassess
/// its overall strategy without discarding accumulated knowledge.
pub const REPLANNING_PROMPT: &str = "Pause and reassess before acting: restate what the task \
still needs, review what the previous tool results established, and decide the most useful \
next step. Then continue. Call final_answer as soon as the task is answerable.";

/// Ordered message log for one run.
///
/// Messages are only ever appended; nothing is mutated or removed once in
/// the log. Owned exclusively by one run and dropped with it.
pub struct Conversation {
    messages: Vec<Value>,
}

impl Conversation {
    /// Seed the log with system instructions and the task.
    pub fn new(system_prompt: &str, task: &str) -> Self {
        Self {
            messages: vec![
                json!({"role": "system", "content": system_prompt}),
                json!({"role": "user", "content": task}),
            ],
        }
    }

    /// Append the model's action message, preserving its tool calls in
    /// OpenAI wire format.
    pub fn push_assistant(&mut self, response: &LLMResponse) {
        let mut msg = json!({
            "role": "assistant",
            "content": response.content.clone().unwrap_or_default(),
        });
        if response.has_tool_calls() {
            let calls: Vec<Value> = response
                .tool_calls
                .iter()
                .map(|tc| tc.to_openai_json())
                .collect();
            msg["tool_calls"] = json!(calls);
        }
        self.messages.push(msg);
    }

    /// Append one tool result. Failures are folded in as data, exactly like
    /// successes; the model sees the `Error:`-prefixed text.
    pub fn push_tool_result(&mut self, tool_call_id: &str, tool_name: &str, outcome: &ToolOutcome) {
        self.messages.push(json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": tool_name,
            "content": outcome.data,
        }));
    }

    /// Append the re-planning prompt as a user turn.
    pub fn push_replanning_prompt(&mut self) {
        self.messages
            .push(json!({"role": "user", "content": REPLANNING_PROMPT}));
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Build the system prompt for a run.
pub fn system_prompt(tool_names: &[String]) -> String {
    let mut names = tool_names.to_vec();
    names.sort();
    format!(
        "You are a research assistant that answers analytical questions by calling tools.\n\
         Work step by step: pick one tool call at a time, read its result, and continue.\n\
         Available tools: {}.\n\
         Tool failures are reported as `Error:` messages; adapt rather than repeating the \
         same failing call.\n\
         When you have enough information, call final_answer with your complete answer.",
        names.join(", ")
    )
}
