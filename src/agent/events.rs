//! Structured run events for external observability.
//!
//! The loop emits one event per model call and per tool invocation on an
//! unbounded channel. A collector (trace exporter, UI, test harness) can
//! subscribe; the crate itself only produces the stream and mirrors it to
//! `tracing`.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Outcome classification carried on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Ok,
    Failed,
}

/// One observable occurrence inside a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEvent {
    /// The model produced (or failed to produce) an action message.
    ModelCall {
        run_id: String,
        step: u32,
        outcome: EventOutcome,
        latency_ms: u64,
    },
    /// One tool invocation completed.
    ToolCall {
        run_id: String,
        step: u32,
        tool_name: String,
        tool_call_id: String,
        outcome: EventOutcome,
        latency_ms: u64,
    },
    /// A re-planning prompt was injected before this step's model call.
    Replanning { run_id: String, step: u32 },
    /// The run reached a terminal state.
    RunFinished {
        run_id: String,
        steps: u32,
        outcome: String,
    },
}

/// Best-effort event emission; a closed receiver never disturbs the run.
pub fn emit(tx: &Option<UnboundedSender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscriber_is_noop() {
        emit(
            &None,
            RunEvent::Replanning {
                run_id: "r1".to_string(),
                step: 4,
            },
        );
    }

    #[test]
    fn test_emit_delivers_event() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        emit(
            &Some(tx),
            RunEvent::ModelCall {
                run_id: "r1".to_string(),
                step: 1,
                outcome: EventOutcome::Ok,
                latency_ms: 42,
            },
        );
        match rx.try_recv().unwrap() {
            RunEvent::ModelCall { step, latency_ms, .. } => {
                assert_eq!(step, 1);
                assert_eq!(latency_ms, 42);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_noop() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        emit(
            &Some(tx),
            RunEvent::RunFinished {
                run_id: "r1".to_string(),
                steps: 3,
                outcome: "final_answer".to_string(),
            },
        );
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = RunEvent::ToolCall {
            run_id: "r9".to_string(),
            step: 2,
            tool_name: "calculate_distance".to_string(),
            tool_call_id: "call_1".to_string(),
            outcome: EventOutcome::Failed,
            latency_ms: 7,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "tool_call");
        assert_eq!(json["outcome"], "failed");
    }
}
