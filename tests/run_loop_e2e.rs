//! End-to-end run through the public API with a scripted model.
//!
//! Real tools (distance, final answer), real registry, real resilient client;
//! only the model itself is a scripted double.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use cargoscout::agent::tools::{DistanceTool, FinalAnswerTool, ToolRegistry};
use cargoscout::agent::{Agent, RunBudget};
use cargoscout::errors::RunError;
use cargoscout::providers::base::{LLMProvider, LLMResponse, ToolCallRequest};
use cargoscout::providers::{ResilientClient, RetryPolicy};

/// Plays back a fixed sequence of responses and records every request.
struct ScriptedModel {
    script: tokio::sync::Mutex<Vec<LLMResponse>>,
    requests: tokio::sync::Mutex<Vec<Vec<Value>>>,
}

impl ScriptedModel {
    fn new(script: Vec<LLMResponse>) -> Self {
        Self {
            script: tokio::sync::Mutex::new(script),
            requests: tokio::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedModel {
    async fn chat(
        &self,
        messages: &[Value],
        _tools: Option<&[Value]>,
        _model: Option<&str>,
        _max_tokens: u32,
        _temperature: f64,
    ) -> anyhow::Result<LLMResponse> {
        self.requests.lock().await.push(messages.to_vec());
        let mut script = self.script.lock().await;
        if script.is_empty() {
            Ok(LLMResponse {
                content: Some("Let me think about that some more.".to_string()),
                tool_calls: vec![],
                finish_reason: "stop".to_string(),
                usage: HashMap::new(),
            })
        } else {
            Ok(script.remove(0))
        }
    }

    fn get_default_model(&self) -> &str {
        "scripted-model"
    }
}

fn call(id: &str, name: &str, args: Value) -> LLMResponse {
    let arguments: HashMap<String, Value> = args
        .as_object()
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default();
    LLMResponse {
        content: None,
        tool_calls: vec![ToolCallRequest {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }],
        finish_reason: "tool_calls".to_string(),
        usage: HashMap::new(),
    }
}

fn build_agent(model: Arc<ScriptedModel>, budget: RunBudget) -> Agent {
    let client = ResilientClient::new(
        model,
        RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)),
        Duration::from_secs(5),
    );
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(DistanceTool));
    registry.register(Box::new(FinalAnswerTool));
    Agent::new(client, Arc::new(registry), budget)
}

#[tokio::test]
async fn distance_task_runs_to_completion() {
    // Chicago to Sydney, then a final answer quoting the computed figure.
    let model = Arc::new(ScriptedModel::new(vec![
        call(
            "call_1",
            "calculate_distance",
            json!({"lat1": 41.8781, "lon1": -87.6298, "lat2": -33.8688, "lon2": 151.2093}),
        ),
        call(
            "call_2",
            "final_answer",
            json!({"answer": "Chicago and Sydney are 14875.88 km apart."}),
        ),
    ]));

    let agent = build_agent(model.clone(), RunBudget::new(20, 4));
    let report = agent.run("How far is Chicago from Sydney?").await.unwrap();

    assert_eq!(report.answer, "Chicago and Sydney are 14875.88 km apart.");
    assert_eq!(report.steps, 2);

    // The tool's real output reached the model on the second request.
    let requests = model.requests.lock().await;
    assert_eq!(requests.len(), 2);
    let tool_msg = requests[1]
        .iter()
        .find(|m| m["role"] == "tool")
        .expect("tool result present in second request");
    assert_eq!(tool_msg["name"], "calculate_distance");
    assert_eq!(tool_msg["content"], "14875.88");
}

#[tokio::test]
async fn invalid_tool_arguments_fold_and_recover() {
    // First call is malformed (latitude 999); the model corrects itself.
    let model = Arc::new(ScriptedModel::new(vec![
        call(
            "call_1",
            "calculate_distance",
            json!({"lat1": 999.0, "lon1": 0.0, "lat2": 0.0, "lon2": 0.0}),
        ),
        call(
            "call_2",
            "calculate_distance",
            json!({"lat1": 52.5200, "lon1": 13.4050, "lat2": 48.8566, "lon2": 2.3522}),
        ),
        call("call_3", "final_answer", json!({"answer": "877.46 km"})),
    ]));

    let agent = build_agent(model.clone(), RunBudget::new(20, 4));
    let report = agent.run("Berlin to Paris?").await.unwrap();
    assert_eq!(report.answer, "877.46 km");
    assert_eq!(report.steps, 3);

    let requests = model.requests.lock().await;
    let error_msg = requests[1]
        .iter()
        .find(|m| m["role"] == "tool")
        .expect("folded error present");
    assert!(error_msg["content"].as_str().unwrap().starts_with("Error:"));
}

#[tokio::test]
async fn run_without_final_answer_exhausts_budget() {
    let model = Arc::new(ScriptedModel::new(vec![]));
    let agent = build_agent(model.clone(), RunBudget::new(4, 2));

    let err = agent.run("Unanswerable question").await.unwrap_err();
    assert!(matches!(err, RunError::BudgetExhausted { steps: 4 }));
    assert_eq!(model.requests.lock().await.len(), 4);
}
