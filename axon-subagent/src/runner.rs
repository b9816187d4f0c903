//! The sub-agent's Thought/Action/Observation/Final Answer step loop (spec
//! §4.3), implementing [`axon_core::SubTaskRunner`] so it plugs directly
//! into `axon-orch`'s concurrent dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use axon_core::{
    CustomEvent, EventSink, HookAction, HookContext, HookPoint, Message, OrchError, StreamEvent, SubTask,
    SubTaskId, SubTaskRunner, ToolCallId, ToolCallRef, WireToolCall, WireToolCallStatus,
};
use axon_context::{ContextStrategy, TokenCounter};
use axon_hooks::HookRegistry;
use axon_tool::{ToolError, ToolRegistry};
use axon_turn::{messages_to_provider, ChatModel, ModelDefaults, ProviderRequest};

use crate::parser::{parse_step, ParsedStep};

/// Forcing instruction appended at the step ceiling (spec §4.3 step 6),
/// verbatim per spec.
const FORCING_INSTRUCTION: &str =
    "You have reached the step limit. You MUST respond with a Final Answer now based on observations so far.";

const FORMAT_REPAIR_INSTRUCTION: &str = "Your previous response did not match the required format. Respond \
    using exactly one of the two forms below, starting at the beginning of a line:\n\n\
    Thought: <reasoning>\nAction: <tool name>\nAction Input: <literal tool input>\n\n\
    or\n\n\
    Final Answer: <your answer>";

/// Tunables for one sub-agent run.
#[derive(Debug, Clone)]
pub struct SubAgentConfig {
    /// Maximum reasoning steps before the forcing turn (spec recommends 6).
    pub max_steps: u32,
    /// Token budget the sub-agent's own conversation is compacted against.
    pub context_budget_tokens: usize,
}

impl Default for SubAgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 6,
            context_budget_tokens: 8_000,
        }
    }
}

enum StepOutcome {
    Final(String),
    Continue,
}

/// Runs one sub-task to a Final Answer using the textual ReAct protocol.
pub struct SubAgentRunner {
    model: Arc<dyn ChatModel>,
    model_defaults: ModelDefaults,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookRegistry>,
    context_strategy: Box<dyn ContextStrategy>,
    counter: TokenCounter,
    sink: Arc<dyn EventSink>,
    config: SubAgentConfig,
}

impl SubAgentRunner {
    /// Construct a runner from its collaborators.
    pub fn new(
        model: Arc<dyn ChatModel>,
        model_defaults: ModelDefaults,
        tools: Arc<ToolRegistry>,
        hooks: Arc<HookRegistry>,
        context_strategy: Box<dyn ContextStrategy>,
        sink: Arc<dyn EventSink>,
        config: SubAgentConfig,
    ) -> Self {
        Self {
            model,
            model_defaults,
            tools,
            hooks,
            context_strategy,
            counter: TokenCounter::new(),
            sink,
            config,
        }
    }

    fn system_prompt(&self, tool_names: &[&str]) -> String {
        let tool_lines = if tool_names.is_empty() {
            "(no tools are available for this task)".to_string()
        } else {
            tool_names
                .iter()
                .filter_map(|name| self.tools.get(name).map(|t| format!("- {}: {}", t.name(), t.description())))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "You are a focused research sub-agent completing one retrieval sub-task for a \
             knowledge-graph-augmented tutoring agent. Work step by step using exactly this format:\n\n\
             Thought: <your reasoning>\n\
             Action: <tool name>\n\
             Action Input: <the literal input to the tool>\n\n\
             You will then be given an Observation. Repeat Thought/Action/Action Input/Observation as many \
             times as needed. Once you have enough information, respond with:\n\n\
             Final Answer: <your answer to the sub-task>\n\n\
             Only call a tool from the list below; never fabricate an Observation yourself.\n\n\
             Available tools:\n{tool_lines}"
        )
    }

    async fn call_model(&self, system: &str, messages: &[Message]) -> Result<String, OrchError> {
        let request = self.model_defaults.build_request(ProviderRequest {
            model: None,
            messages: messages_to_provider(messages),
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
            system: Some(system.to_string()),
            timeout: None,
            extra: serde_json::Value::Null,
        });
        let response = self
            .model
            .complete(request)
            .await
            .map_err(|err| OrchError::Model(err.to_string()))?;
        Ok(response.text())
    }

    async fn take_step(
        &self,
        task: &SubTask,
        system: &str,
        messages: &mut Vec<Message>,
        raw: String,
        tool_refs: &[&str],
    ) -> Result<StepOutcome, OrchError> {
        match parse_step(&raw, tool_refs) {
            Some(ParsedStep::FinalAnswer(answer)) => Ok(StepOutcome::Final(answer)),
            Some(ParsedStep::Action { thought, tool, input }) => {
                self.run_action(task, messages, thought, tool, input).await
            }
            None => {
                messages.push(Message::assistant(raw));
                messages.push(Message::user(FORMAT_REPAIR_INSTRUCTION));
                let repaired = self.call_model(system, messages).await?;
                match parse_step(&repaired, tool_refs) {
                    Some(ParsedStep::FinalAnswer(answer)) => Ok(StepOutcome::Final(answer)),
                    Some(ParsedStep::Action { thought, tool, input }) => {
                        self.run_action(task, messages, thought, tool, input).await
                    }
                    None => Ok(StepOutcome::Final(repaired)),
                }
            }
        }
    }

    async fn run_action(
        &self,
        task: &SubTask,
        messages: &mut Vec<Message>,
        thought: Option<String>,
        tool: String,
        input: String,
    ) -> Result<StepOutcome, OrchError> {
        let call_id = ToolCallId::new(Uuid::new_v4().to_string());
        messages.push(Message::Assistant {
            content: thought.clone().unwrap_or_default(),
            tool_calls: vec![ToolCallRef {
                id: call_id.to_string(),
                name: tool.clone(),
                args: input.clone(),
            }],
            reasoning_content: None,
        });

        self.emit_tool_call(
            &task.id,
            &call_id,
            Some(tool.clone()),
            Some(input.clone()),
            thought.clone(),
            WireToolCallStatus::Pending,
            None,
        )
        .await;

        let pre_ctx = self.hook_context(HookPoint::PreToolCall, task, &tool, &input, None);
        let (effective_input, skipped) = match self.hooks.dispatch(&pre_ctx).await {
            HookAction::ModifyToolInput { new_input } => (new_input, None),
            HookAction::SkipTool { reason } => (input.clone(), Some(reason)),
            HookAction::Halt { reason } => {
                let observation = format!("Halted: {reason}");
                self.emit_tool_call(
                    &task.id,
                    &call_id,
                    Some(tool.clone()),
                    Some(input.clone()),
                    thought,
                    WireToolCallStatus::Error,
                    Some(observation.clone()),
                )
                .await;
                return Ok(StepOutcome::Final(observation));
            }
            HookAction::Continue | HookAction::ModifyToolOutput { .. } => (input.clone(), None),
        };

        let (observation, is_error) = if let Some(reason) = skipped {
            (format!("Skipped: {reason}"), false)
        } else if let Some(handler) = self.tools.get(&tool) {
            match handler.call(&effective_input).await {
                Ok(result) => (result, false),
                Err(err) => (format!("Error: tool '{tool}' raised {}: {err}", error_class(&err)), true),
            }
        } else {
            (
                format!(
                    "Error: unknown tool '{tool}'. Available tools: {}",
                    self.tools.names().join(", ")
                ),
                true,
            )
        };

        let post_ctx = self.hook_context(HookPoint::PostToolCall, task, &tool, &effective_input, Some(observation.clone()));
        let observation = match self.hooks.dispatch(&post_ctx).await {
            HookAction::ModifyToolOutput { new_output } => new_output,
            _ => observation,
        };

        self.emit_tool_call(
            &task.id,
            &call_id,
            Some(tool.clone()),
            Some(effective_input),
            thought,
            if is_error {
                WireToolCallStatus::Error
            } else {
                WireToolCallStatus::Completed
            },
            Some(observation.clone()),
        )
        .await;

        messages.push(Message::tool_result(call_id.to_string(), observation, is_error));
        Ok(StepOutcome::Continue)
    }

    fn hook_context(&self, point: HookPoint, task: &SubTask, tool: &str, input: &str, result: Option<String>) -> HookContext {
        let mut ctx = HookContext::new(point);
        ctx.sub_task_id = Some(task.id.to_string());
        ctx.tool_name = Some(tool.to_string());
        ctx.tool_input = Some(input.to_string());
        ctx.tool_result = result;
        ctx
    }

    async fn emit_tool_call(
        &self,
        sub_task_id: &SubTaskId,
        call_id: &ToolCallId,
        name: Option<String>,
        args: Option<String>,
        thought: Option<String>,
        status: WireToolCallStatus,
        result: Option<String>,
    ) {
        let event = StreamEvent::Custom(CustomEvent::SubtaskToolCall {
            sub_task_id: sub_task_id.clone(),
            tool_call: WireToolCall {
                id: call_id.clone(),
                name,
                args,
                thought,
                status,
                result,
            },
        });
        if let Err(err) = self.sink.emit(event).await {
            tracing::warn!(error = %err, "stream emit failed, continuing");
        }
    }
}

fn error_class(err: &ToolError) -> &'static str {
    match err {
        ToolError::NotFound(_) => "NotFound",
        ToolError::ExecutionFailed(_) => "ExecutionFailed",
        ToolError::Transient(_) => "Transient",
        ToolError::InvalidInput(_) => "InvalidInput",
        ToolError::Other(_) => "Other",
        _ => "ToolError",
    }
}

fn task_prompt(task: &SubTask) -> String {
    match &task.tool_hint {
        Some(hint) if !hint.is_empty() => format!("Sub-task: {}\n\n(Suggested tool: {hint})", task.task),
        _ => format!("Sub-task: {}", task.task),
    }
}

#[async_trait]
impl SubTaskRunner for SubAgentRunner {
    async fn run_sub_task(&self, task: SubTask) -> Result<String, OrchError> {
        let mut tool_names: Vec<String> = self.tools.names().into_iter().map(String::from).collect();
        tool_names.sort();
        let tool_refs: Vec<&str> = tool_names.iter().map(String::as_str).collect();
        let system = self.system_prompt(&tool_refs);
        let mut messages: Vec<Message> = vec![Message::user(task_prompt(&task))];

        for _ in 0..self.config.max_steps.max(1) {
            let raw = self.call_model(&system, &messages).await?;
            match self.take_step(&task, &system, &mut messages, raw, &tool_refs).await? {
                StepOutcome::Final(answer) => return Ok(answer),
                StepOutcome::Continue => {
                    messages = self
                        .context_strategy
                        .compact(messages, self.config.context_budget_tokens, &self.counter);
                }
            }
        }

        messages.push(Message::user(FORCING_INSTRUCTION));
        let raw = self.call_model(&system, &messages).await?;
        match parse_step(&raw, &tool_refs) {
            Some(ParsedStep::FinalAnswer(answer)) => Ok(answer),
            _ => Ok(raw),
        }
    }
}
