//! Tool registry: explicit construction, uniform dispatch.

use std::collections::HashMap;

use super::base::{Tool, ToolOutcome};
use crate::errors::ToolErrorKind;

/// Registry for agent tools.
///
/// Built once at startup and shared read-only across runs. There are no
/// hidden global registries; the orchestrator receives this by reference.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a reference to a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions in OpenAI format.
    pub fn get_definitions(&self) -> Vec<serde_json::Value> {
        self.tools.values().map(|tool| tool.to_schema()).collect()
    }

    /// Execute a tool by name with given arguments.
    ///
    /// Unknown names become a `ToolNotFound` failure value rather than an
    /// error, so the model sees the problem as data. Panics are caught so
    /// a single tool cannot crash the run.
    pub async fn execute(
        &self,
        name: &str,
        args: HashMap<String, serde_json::Value>,
    ) -> ToolOutcome {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                return ToolOutcome::failure(ToolErrorKind::ToolNotFound(name.to_string()));
            }
        };

        let fut = std::panic::AssertUnwindSafe(tool.invoke(args));
        match futures_util::FutureExt::catch_unwind(fut).await {
            Ok(result) => result,
            Err(_) => ToolOutcome::failure(ToolErrorKind::ExecutionFailed(format!(
                "tool '{}' panicked during execution",
                name
            ))),
        }
    }

    /// Get list of registered tool names.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
