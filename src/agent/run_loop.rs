//! The orchestrator: a bounded, re-planning tool-call loop.
//!
//! One run is a strictly sequential state machine: ask the model for the
//! next action (Planning), execute the tool calls it requested (Acting),
//! fold the results back into the conversation, and repeat until the model
//! calls `final_answer` or the step budget runs out. Tool failures are data;
//! only model exhaustion, cancellation, and budget exhaustion end a run
//! without an answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::conversation::{system_prompt, Conversation};
use crate::agent::events::{emit, EventOutcome, RunEvent};
use crate::agent::tools::{ToolOutcome, ToolRegistry, FINAL_ANSWER_TOOL};
use crate::errors::{RunError, ToolErrorKind};
use crate::providers::ResilientClient;

/// Per-run step limits. Immutable for the life of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunBudget {
    pub max_steps: u32,
    pub planning_interval: u32,
}

impl RunBudget {
    /// Both limits must be positive; zero values are bumped to one.
    pub fn new(max_steps: u32, planning_interval: u32) -> Self {
        Self {
            max_steps: max_steps.max(1),
            planning_interval: planning_interval.max(1),
        }
    }
}

impl Default for RunBudget {
    fn default() -> Self {
        Self {
            max_steps: 20,
            planning_interval: 4,
        }
    }
}

/// Terminal success value for one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub answer: String,
    pub steps: u32,
}

/// Drives runs against a shared tool registry and a resilient model client.
///
/// The registry and client are shared read-only; each call to [`Agent::run`]
/// owns its own conversation and counters, so independent runs can execute
/// concurrently.
pub struct Agent {
    client: ResilientClient,
    registry: Arc<ToolRegistry>,
    budget: RunBudget,
    tool_timeout: Duration,
    cancel: CancellationToken,
    events: Option<UnboundedSender<RunEvent>>,
}

impl Agent {
    pub fn new(client: ResilientClient, registry: Arc<ToolRegistry>, budget: RunBudget) -> Self {
        Self {
            client,
            registry,
            budget,
            tool_timeout: Duration::from_secs(60),
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Subscribe an event channel for structured observability.
    pub fn with_events(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Token for external cancellation. Checked between steps, never
    /// mid-tool-call.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute one run for `task`.
    pub async fn run(&self, task: &str) -> Result<RunReport, RunError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut conversation =
            Conversation::new(&system_prompt(&self.registry.tool_names()), task);
        let tool_definitions = self.registry.get_definitions();

        info!(run_id, max_steps = self.budget.max_steps, "run started");

        for step in 1..=self.budget.max_steps {
            if self.cancel.is_cancelled() {
                info!(run_id, step, "run cancelled");
                emit(
                    &self.events,
                    RunEvent::RunFinished {
                        run_id,
                        steps: step - 1,
                        outcome: "cancelled".to_string(),
                    },
                );
                return Err(RunError::Cancelled);
            }

            if step % self.budget.planning_interval == 0 {
                conversation.push_replanning_prompt();
                debug!(run_id, step, "re-planning prompt injected");
                emit(
                    &self.events,
                    RunEvent::Replanning {
                        run_id: run_id.clone(),
                        step,
                    },
                );
            }

            // Planning: one model call. Retries live inside the client.
            let started = Instant::now();
            let response = match self
                .client
                .complete(conversation.messages(), Some(&tool_definitions))
                .await
            {
                Ok(r) => {
                    emit(
                        &self.events,
                        RunEvent::ModelCall {
                            run_id: run_id.clone(),
                            step,
                            outcome: EventOutcome::Ok,
                            latency_ms: started.elapsed().as_millis() as u64,
                        },
                    );
                    r
                }
                Err(e) => {
                    warn!(run_id, step, "model unavailable: {}", e);
                    emit(
                        &self.events,
                        RunEvent::ModelCall {
                            run_id: run_id.clone(),
                            step,
                            outcome: EventOutcome::Failed,
                            latency_ms: started.elapsed().as_millis() as u64,
                        },
                    );
                    emit(
                        &self.events,
                        RunEvent::RunFinished {
                            run_id,
                            steps: step,
                            outcome: "model_unavailable".to_string(),
                        },
                    );
                    return Err(e);
                }
            };

            conversation.push_assistant(&response);

            // Acting: execute tool calls sequentially, in model order.
            for call in &response.tool_calls {
                let tool_started = Instant::now();
                let outcome = match tokio::time::timeout(
                    self.tool_timeout,
                    self.registry.execute(&call.name, call.arguments.clone()),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => ToolOutcome::failure(ToolErrorKind::UpstreamUnavailable(format!(
                        "tool '{}' timed out after {}s",
                        call.name,
                        self.tool_timeout.as_secs()
                    ))),
                };

                debug!(
                    run_id,
                    step,
                    tool = call.name.as_str(),
                    ok = outcome.ok,
                    "tool executed"
                );
                emit(
                    &self.events,
                    RunEvent::ToolCall {
                        run_id: run_id.clone(),
                        step,
                        tool_name: call.name.clone(),
                        tool_call_id: call.id.clone(),
                        outcome: if outcome.ok {
                            EventOutcome::Ok
                        } else {
                            EventOutcome::Failed
                        },
                        latency_ms: tool_started.elapsed().as_millis() as u64,
                    },
                );

                conversation.push_tool_result(&call.id, &call.name, &outcome);

                if call.name == FINAL_ANSWER_TOOL && outcome.ok {
                    info!(run_id, step, "final answer emitted");
                    emit(
                        &self.events,
                        RunEvent::RunFinished {
                            run_id: run_id.clone(),
                            steps: step,
                            outcome: "final_answer".to_string(),
                        },
                    );
                    return Ok(RunReport {
                        run_id,
                        answer: outcome.data,
                        steps: step,
                    });
                }
            }
        }

        info!(run_id, "step budget exhausted");
        emit(
            &self.events,
            RunEvent::RunFinished {
                run_id,
                steps: self.budget.max_steps,
                outcome: "budget_exhausted".to_string(),
            },
        );
        Err(RunError::BudgetExhausted {
            steps: self.budget.max_steps,
        })
    }
}
