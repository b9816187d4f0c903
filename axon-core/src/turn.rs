//! Per-turn state: the plan, its sub-tasks, accumulated evidence, and the
//! message log, threaded through one user turn from `plan` to `respond`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::duration::DurationMs;
use crate::id::{SubTaskId, ToolCallId};
use crate::message::Message;

/// Status of a plan item / tool call, shared by both.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started.
    Pending,
    /// Currently being worked.
    InProgress,
    /// Finished, successfully or not.
    Completed,
}

/// A single Planner-produced sub-task.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItem {
    /// Sub-task identifier, stable for the turn.
    pub id: SubTaskId,
    /// Natural-language description of the work.
    pub task: String,
    /// Optional hint at which tool should be preferred.
    pub tool_hint: Option<String>,
    /// Lifecycle status, mutated by the sub-agent runner.
    pub status: TaskStatus,
}

impl PlanItem {
    /// Construct a pending plan item.
    pub fn new(id: SubTaskId, task: impl Into<String>, tool_hint: Option<String>) -> Self {
        Self {
            id,
            task: task.into(),
            tool_hint,
            status: TaskStatus::Pending,
        }
    }
}

/// Status of one tool-call event (spec §3 "Tool-call event").
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Dispatched, awaiting a result.
    Pending,
    /// Completed successfully.
    Completed,
    /// Completed with an error.
    Error,
}

/// A single tool invocation raised by the sub-agent runner and streamed to
/// the caller. Every id is emitted as exactly one `Pending` event followed
/// by exactly one terminal (`Completed` or `Error`) event.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    /// Unique id for this call.
    pub id: ToolCallId,
    /// Sub-task this call belongs to.
    pub sub_task_id: SubTaskId,
    /// Name of the tool invoked.
    pub tool_name: String,
    /// The literal `Action Input` string passed to the tool.
    pub args: String,
    /// The Thought text that preceded this action, if any.
    pub thought: Option<String>,
    /// Current status.
    pub status: ToolCallStatus,
    /// The tool's (possibly truncated) result text, once terminal.
    pub result: Option<String>,
}

impl ToolCallEvent {
    /// Construct a new pending event.
    pub fn pending(
        id: ToolCallId,
        sub_task_id: SubTaskId,
        tool_name: impl Into<String>,
        args: impl Into<String>,
        thought: Option<String>,
    ) -> Self {
        Self {
            id,
            sub_task_id,
            tool_name: tool_name.into(),
            args: args.into(),
            thought,
            status: ToolCallStatus::Pending,
            result: None,
        }
    }

    /// Transition this event to a terminal state.
    pub fn complete(&mut self, result: impl Into<String>, is_error: bool) {
        self.status = if is_error {
            ToolCallStatus::Error
        } else {
            ToolCallStatus::Completed
        };
        self.result = Some(result.into());
    }
}

/// The full state of one user turn, threaded through
/// `plan → execute → aggregate → judge → respond`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    /// The accumulated message log for this turn.
    pub messages: Vec<Message>,
    /// The current user question driving this turn.
    pub question: String,
    /// Free-text rendering of the caller's profile (may be empty).
    pub user_profile: String,
    /// The current plan's sub-tasks.
    pub todos: Vec<PlanItem>,
    /// Number of completed Planner invocations so far.
    pub iteration: u32,
    /// Maximum number of Planner invocations before forced termination.
    pub max_iterations: u32,
    /// Final-Answer strings from completed sub-tasks, in sub-task index
    /// order, across all iterations. Each entry is prefixed with its
    /// sub-task's id and description by `axon-orch`'s `execute` node before
    /// being pushed here (spec glossary: "The Final Answer string produced
    /// by one sub-task, prefixed for attribution"), so the aggregated
    /// evidence below lets the Planner, Judge, and Responder tell which
    /// sub-task produced which block.
    pub intermediate_results: Vec<String>,
    /// The composed final answer, populated by `respond`.
    pub final_answer: Option<String>,
    /// Cumulative cost across every model call this turn.
    pub cost: Decimal,
    /// Wall-clock elapsed since the turn started.
    pub elapsed: DurationMs,
}

impl TurnState {
    /// Start a new turn for `question`, with an empty plan and no evidence.
    pub fn new(question: impl Into<String>, user_profile: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            messages: Vec::new(),
            question: question.into(),
            user_profile: user_profile.into(),
            todos: Vec::new(),
            iteration: 0,
            max_iterations: max_iterations.max(1),
            intermediate_results: Vec::new(),
            final_answer: None,
            cost: Decimal::ZERO,
            elapsed: DurationMs::ZERO,
        }
    }

    /// Whether the iteration ceiling has been reached.
    pub fn at_ceiling(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Concatenate intermediate results with the aggregation separator.
    pub fn aggregated_evidence(&self) -> String {
        self.intermediate_results.join("\n---\n")
    }
}
