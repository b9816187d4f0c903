//! Hook points around orchestrator and sub-agent lifecycle events.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::duration::DurationMs;
use crate::error::HookError;

/// A point in the turn lifecycle at which hooks may observe or intervene.
///
/// Unlike the raw per-inference-call points this is generalized from, these
/// sit at the orchestrator's node boundaries and around each sub-agent tool
/// call, since that is where the turn actually has interesting state to
/// inspect (a plan, a judge verdict, a tool invocation).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before the Planner is invoked.
    PrePlan,
    /// After the Planner produced (or failed to produce) a plan.
    PostPlan,
    /// Before a sub-agent dispatches a tool call.
    PreToolCall,
    /// After a tool call returned (success or error).
    PostToolCall,
    /// Before the Judge is invoked.
    PreJudge,
    /// After the Judge returned a verdict.
    PostJudge,
}

/// Context passed to a hook at a given [`HookPoint`].
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The point this context was raised at.
    pub point: HookPoint,
    /// The sub-task this event belongs to, if any.
    pub sub_task_id: Option<String>,
    /// Name of the tool involved, for tool-call points.
    pub tool_name: Option<String>,
    /// The literal tool input string, for tool-call points.
    pub tool_input: Option<String>,
    /// The tool's result text, for `PostToolCall`.
    pub tool_result: Option<String>,
    /// The model's text output at this point, if any.
    pub model_output: Option<String>,
    /// Cumulative tokens used by the turn so far.
    pub tokens_used: u64,
    /// Cumulative estimated cost of the turn so far.
    pub cost: Decimal,
    /// Number of Planner iterations completed so far.
    pub iteration: u32,
    /// Wall-clock elapsed since turn start.
    pub elapsed: DurationMs,
    /// Free-form extra fields, for forward compatibility.
    pub extra: HashMap<String, String>,
}

impl HookContext {
    /// Construct a minimal context for a given point; all optional fields
    /// start empty/zeroed.
    pub fn new(point: HookPoint) -> Self {
        Self {
            point,
            sub_task_id: None,
            tool_name: None,
            tool_input: None,
            tool_result: None,
            model_output: None,
            tokens_used: 0,
            cost: Decimal::ZERO,
            iteration: 0,
            elapsed: DurationMs::ZERO,
            extra: HashMap::new(),
        }
    }
}

/// What a hook asks the caller to do after observing an event.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum HookAction {
    /// Proceed normally.
    Continue,
    /// Abort the turn with the given reason.
    Halt {
        /// Human-readable reason surfaced in logs (never to the caller).
        reason: String,
    },
    /// Skip the tool call this hook observed, substituting no observation.
    SkipTool {
        /// Human-readable reason.
        reason: String,
    },
    /// Replace the tool input before it is dispatched.
    ModifyToolInput {
        /// The new literal tool input string.
        new_input: String,
    },
    /// Replace the tool output before it is fed back to the model.
    ModifyToolOutput {
        /// The new tool output string.
        new_output: String,
    },
}

/// A single hook. Hooks are registered against the [`HookPoint`]s they care
/// about and run in registration order; the first non-`Continue` action
/// short-circuits the remaining hooks for that event.
#[async_trait]
pub trait Hook: Send + Sync {
    /// The points this hook wants to observe.
    fn points(&self) -> &[HookPoint];

    /// Called when one of `points()` fires.
    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError>;
}
