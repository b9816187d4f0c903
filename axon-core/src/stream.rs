//! Streaming event schema for the SSE delivery contract (spec §6) and the
//! `EventSink` abstraction that lets the Orchestrator stay transport-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::id::{SubTaskId, ToolCallId};

/// A streaming scope label attached to reasoning/content deltas so
/// consumers can route them to distinct UI regions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The Planner is thinking/producing a plan.
    Planning,
    /// The Judge is reviewing aggregated evidence.
    Reviewing,
    /// The Responder is composing the final answer.
    Answering,
}

/// Phase of the Orchestrator's node sequence, surfaced in `state` events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Running the Planner.
    Planning,
    /// Dispatching sub-tasks.
    Executing,
    /// Running the Judge.
    Reviewing,
    /// Running the Responder.
    Answering,
}

/// Status of a tool call as surfaced on the wire (spec §6 `subtask_tool_call`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireToolCallStatus {
    /// Dispatched, awaiting a result.
    Pending,
    /// Completed successfully.
    Completed,
    /// Completed with an error.
    Error,
}

/// The wire shape of a tool call inside a `subtask_tool_call` custom event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Tool-call id.
    pub id: ToolCallId,
    /// Tool name, present once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Literal tool arguments, present once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    /// The Thought text preceding this call, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    /// Lifecycle status.
    pub status: WireToolCallStatus,
    /// Result text, once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// The user message echoed in the `metadata` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireUserMessage {
    /// Message id.
    pub id: String,
    /// Always `"user"`.
    pub role: String,
    /// The literal message text.
    pub content: String,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

/// Custom event payloads (the `custom` SSE event's `type`-tagged body).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomEvent {
    /// Start a new reasoning scope; consumers should clear prior deltas.
    ReasoningReset {
        /// Which logical channel is resetting.
        scope: Scope,
    },
    /// Start a new content scope; consumers should clear prior deltas.
    ContentReset {
        /// Which logical channel is resetting.
        scope: Scope,
    },
    /// An incremental reasoning-channel text fragment.
    ReasoningDelta {
        /// Which logical channel this fragment belongs to.
        scope: Scope,
        /// The text fragment.
        delta: String,
    },
    /// An incremental content-channel text fragment.
    ContentDelta {
        /// Which logical channel this fragment belongs to.
        scope: Scope,
        /// The text fragment.
        delta: String,
    },
    /// A sub-task transitioned status.
    SubtaskStatus {
        /// The sub-task this status applies to.
        sub_task_id: SubTaskId,
        /// `"in_progress"` or `"completed"`.
        status: String,
    },
    /// A sub-task's tool call changed state.
    SubtaskToolCall {
        /// The sub-task this call belongs to.
        sub_task_id: SubTaskId,
        /// The tool call's current wire state.
        tool_call: WireToolCall,
    },
    /// A sub-task produced its Final Answer.
    SubtaskResult {
        /// The sub-task this result belongs to.
        sub_task_id: SubTaskId,
        /// The Final Answer text.
        result: String,
    },
}

/// One event in the per-turn SSE stream (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Session and echoed user message, emitted once at turn start.
    Metadata {
        /// The session this turn belongs to.
        session_id: String,
        /// The triggering user message.
        user_message: WireUserMessage,
    },
    /// One of the tagged custom payloads above.
    Custom(CustomEvent),
    /// A snapshot of orchestrator progress.
    State {
        /// Current orchestrator phase.
        phase: Phase,
        /// Current plan items.
        todos: Vec<crate::turn::PlanItem>,
        /// The final answer, once populated.
        final_answer: Option<String>,
        /// Number of completed Planner invocations so far.
        iteration: u32,
    },
    /// Terminal success event.
    Done {
        /// The assistant message appended to the turn's log.
        assistant_message: String,
        /// The final answer text.
        final_answer: String,
    },
    /// Terminal failure event.
    Error {
        /// A caller-safe error description; never the raw exception text.
        detail: String,
    },
}

/// Destination for streamed turn events. Implementations bridge to a real
/// transport (an SSE body, a channel, a test collector); emission is
/// best-effort — a failed `emit` must never abort the turn, so this trait
/// reports failures but callers are expected to log-and-continue rather
/// than propagate them upward.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit one event. Returns `Err` on a transport failure; callers must
    /// treat this as non-fatal to the turn.
    async fn emit(&self, event: StreamEvent) -> Result<(), std::io::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_event_tag_matches_spec_schema() {
        let ev = CustomEvent::ReasoningDelta {
            scope: Scope::Planning,
            delta: "thinking...".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "reasoning_delta");
        assert_eq!(json["scope"], "planning");
        assert_eq!(json["delta"], "thinking...");
    }

    #[test]
    fn stream_event_wraps_custom_payload() {
        let ev = StreamEvent::Custom(CustomEvent::SubtaskStatus {
            sub_task_id: SubTaskId::new("t1"),
            status: "in_progress".into(),
        });
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "custom");
        assert_eq!(json["data"]["type"], "subtask_status");
    }

    #[test]
    fn done_event_serializes_expected_fields() {
        let ev = StreamEvent::Done {
            assistant_message: "here's the answer".into(),
            final_answer: "BFS is...".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "done");
        assert_eq!(json["data"]["final_answer"], "BFS is...");
    }
}
