//! The Orchestrator state machine (spec §4.1): `plan → execute → aggregate →
//! judge → (plan | respond) → END`.

use std::sync::Arc;

use axon_context::render_history;
use axon_core::{
    dispatch_many, CustomEvent, EventSink, Message, OrchError, Phase, StreamEvent, SubTask, SubTaskRunner,
    TaskStatus, TurnState,
};
use axon_turn::{ChatModel, ContentPart, ProviderRequest, Role};
use serde_json::Value;

use crate::judge::{build_judge_prompt, parse_verdict};
use crate::planner::{build_planner_prompt, parse_plan};
use crate::responder::{build_responder_prompt, APOLOGY_TEXT};
use crate::stream_support::stream_scope;

/// The three model roles the Orchestrator drives, resolved by the caller
/// from config (spec §6 "model endpoints ... for the reasoning and
/// non-reasoning chat models"). All three may point at the same model.
#[derive(Clone)]
pub struct OrchModels {
    /// Backs the Planner (spec §4.2).
    pub planner: Arc<dyn ChatModel>,
    /// Backs the Judge (spec §4.6).
    pub judge: Arc<dyn ChatModel>,
    /// Backs the Responder (spec §4.6).
    pub responder: Arc<dyn ChatModel>,
}

/// Knobs the Orchestrator itself consumes (spec §6 configuration surface).
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sub-task fan-out concurrency cap (spec §5 `agent_concurrency`, default 3).
    pub agent_concurrency: usize,
    /// How many recent dialogue rounds the Planner sees (spec §6
    /// `session_history_rounds`).
    pub session_history_rounds: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_concurrency: 3,
            session_history_rounds: 5,
        }
    }
}

fn bare_request(system: String, user: String) -> ProviderRequest {
    ProviderRequest {
        model: None,
        messages: vec![axon_turn::ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text { text: user }],
        }],
        tools: Vec::new(),
        max_tokens: None,
        temperature: None,
        system: Some(system),
        timeout: None,
        extra: Value::Null,
    }
}

/// Stream a model call under `scope`; on a stream failure or empty content,
/// fall back to a non-streaming `complete` call. Propagates a failure from
/// both attempts as an [`OrchError::Model`].
async fn call_model_text(
    model: &dyn ChatModel,
    request: ProviderRequest,
    scope: axon_core::Scope,
    sink: &dyn EventSink,
) -> Result<String, OrchError> {
    match stream_scope(model, request.clone(), scope, sink).await {
        Ok((content, _reasoning)) if !content.trim().is_empty() => Ok(content),
        _ => model
            .complete(request)
            .await
            .map(|r| r.text())
            .map_err(|e| OrchError::Model(e.to_string())),
    }
}

/// Same as [`call_model_text`] but never propagates a failure — returns an
/// empty string instead, so the Responder can fall back to [`APOLOGY_TEXT`]
/// (spec §7 "Streaming model failure").
async fn call_model_text_lenient(
    model: &dyn ChatModel,
    request: ProviderRequest,
    scope: axon_core::Scope,
    sink: &dyn EventSink,
) -> String {
    call_model_text(model, request, scope, sink).await.unwrap_or_default()
}

async fn emit_state(turn: &TurnState, phase: Phase, sink: &dyn EventSink) {
    let event = StreamEvent::State {
        phase,
        todos: turn.todos.clone(),
        final_answer: turn.final_answer.clone(),
        iteration: turn.iteration,
    };
    if let Err(err) = sink.emit(event).await {
        tracing::warn!(error = %err, "state emit failed, continuing");
    }
}

async fn emit_custom(sink: &dyn EventSink, event: CustomEvent) {
    if let Err(err) = sink.emit(StreamEvent::Custom(event)).await {
        tracing::warn!(error = %err, "custom emit failed, continuing");
    }
}

async fn plan_node(
    models: &OrchModels,
    config: &OrchestratorConfig,
    turn: &mut TurnState,
    sink: &dyn EventSink,
) -> Result<(), OrchError> {
    emit_state(turn, Phase::Planning, sink).await;

    let history = render_history(&turn.messages, config.session_history_rounds);
    let prior_evidence = if turn.iteration > 0 {
        Some(turn.aggregated_evidence())
    } else {
        None
    };
    let (system, user) = build_planner_prompt(
        &turn.question,
        &turn.user_profile,
        turn.max_iterations,
        &history,
        prior_evidence.as_deref(),
    );
    let request = bare_request(system, user);

    let raw = call_model_text(models.planner.as_ref(), request, axon_core::Scope::Planning, sink).await?;
    turn.todos = parse_plan(&raw);
    turn.iteration += 1;
    turn.messages.push(Message::assistant(format!("[Plan] {raw}")));

    emit_state(turn, Phase::Planning, sink).await;
    Ok(())
}

async fn execute_node(
    runner: Arc<dyn SubTaskRunner>,
    config: &OrchestratorConfig,
    turn: &mut TurnState,
    sink: &dyn EventSink,
) {
    emit_state(turn, Phase::Executing, sink).await;

    let tasks: Vec<SubTask> = turn
        .todos
        .iter()
        .map(|p| SubTask {
            id: p.id.clone(),
            task: p.task.clone(),
            tool_hint: p.tool_hint.clone(),
        })
        .collect();

    for item in turn.todos.iter_mut() {
        item.status = TaskStatus::InProgress;
    }
    for item in &turn.todos {
        emit_custom(
            sink,
            CustomEvent::SubtaskStatus {
                sub_task_id: item.id.clone(),
                status: "in_progress".into(),
            },
        )
        .await;
    }

    let results = dispatch_many(runner, tasks, config.agent_concurrency.max(1)).await;

    let mut attributed = Vec::with_capacity(results.len());
    for (item, (sub_task_id, result)) in turn.todos.iter_mut().zip(results.into_iter()) {
        item.status = TaskStatus::Completed;
        emit_custom(
            sink,
            CustomEvent::SubtaskResult {
                sub_task_id: sub_task_id.clone(),
                result: result.clone(),
            },
        )
        .await;
        emit_custom(
            sink,
            CustomEvent::SubtaskStatus {
                sub_task_id: sub_task_id.clone(),
                status: "completed".into(),
            },
        )
        .await;
        // Prefix for attribution (spec glossary: "The Final Answer string
        // produced by one sub-task, prefixed for attribution") so the
        // Planner, Judge, and Responder can tell which sub-task produced
        // which block of aggregated evidence.
        attributed.push(format!("[Sub-task {sub_task_id} — {}] {result}", item.task));
    }

    turn.intermediate_results.extend(attributed);
}

fn aggregate_node(turn: &mut TurnState) {
    let aggregated = turn.aggregated_evidence();
    turn.messages.push(Message::assistant(format!("[Aggregated Results] {aggregated}")));
}

async fn judge_node(models: &OrchModels, turn: &mut TurnState, sink: &dyn EventSink) -> Result<bool, OrchError> {
    emit_state(turn, Phase::Reviewing, sink).await;

    let (system, user) = build_judge_prompt(&turn.question, &turn.aggregated_evidence());
    let request = bare_request(system, user);
    let raw = call_model_text(models.judge.as_ref(), request, axon_core::Scope::Reviewing, sink).await?;

    let verdict = parse_verdict(&raw);
    turn.messages.push(Message::assistant(format!("[Quality Review] {}", raw.trim())));

    Ok(verdict.sufficient)
}

async fn respond_node(models: &OrchModels, turn: &mut TurnState, sink: &dyn EventSink) {
    emit_state(turn, Phase::Answering, sink).await;

    let (system, user) = build_responder_prompt(&turn.question, &turn.user_profile, &turn.aggregated_evidence());
    let request = bare_request(system, user);
    let answer = call_model_text_lenient(models.responder.as_ref(), request, axon_core::Scope::Answering, sink).await;

    let final_text = if answer.trim().is_empty() {
        APOLOGY_TEXT.to_string()
    } else {
        answer
    };

    turn.final_answer = Some(final_text.clone());
    turn.messages.push(Message::assistant(final_text.clone()));

    emit_state(turn, Phase::Answering, sink).await;
    if let Err(err) = sink
        .emit(StreamEvent::Done {
            assistant_message: final_text.clone(),
            final_answer: final_text,
        })
        .await
    {
        tracing::warn!(error = %err, "done emit failed");
    }
}

/// Drive `turn` through `plan → execute → aggregate → judge → (plan |
/// respond)` until the Judge returns sufficient or the iteration ceiling is
/// reached, then run the Responder.
pub async fn run_turn(
    models: &OrchModels,
    config: &OrchestratorConfig,
    runner: Arc<dyn SubTaskRunner>,
    turn: &mut TurnState,
    sink: &dyn EventSink,
) -> Result<(), OrchError> {
    loop {
        plan_node(models, config, turn, sink).await?;
        execute_node(Arc::clone(&runner), config, turn, sink).await;
        aggregate_node(turn);
        let sufficient = judge_node(models, turn, sink).await?;
        if sufficient || turn.at_ceiling() {
            break;
        }
    }
    respond_node(models, turn, sink).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axon_turn::{ChatModel, DeltaScope, DeltaStream, ProviderResponse, StopReason, StreamDelta, TokenUsage};
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;

    struct ScriptedModel {
        replies: AsyncMutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: AsyncMutex::new(replies.into_iter().map(String::from).rev().collect()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, axon_turn::ProviderError> {
            let text = self.replies.lock().await.pop().unwrap_or_default();
            Ok(ProviderResponse {
                content: vec![ContentPart::Text { text }],
                reasoning: None,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
                model: "scripted".into(),
                cost: None,
                truncated: None,
            })
        }

        async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, axon_turn::ProviderError> {
            let response = self.complete(request).await?;
            let text = response.text();
            let stream = futures::stream::once(async move {
                Ok::<StreamDelta, axon_turn::ProviderError>(StreamDelta {
                    scope: DeltaScope::Content,
                    text,
                })
            });
            Ok(Box::pin(stream) as DeltaStream)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct NullSink;

    #[async_trait]
    impl EventSink for NullSink {
        async fn emit(&self, _event: StreamEvent) -> Result<(), std::io::Error> {
            Ok(())
        }
    }

    struct CollectingSink {
        events: Mutex<Vec<StreamEvent>>,
    }

    impl CollectingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventSink for CollectingSink {
        async fn emit(&self, event: StreamEvent) -> Result<(), std::io::Error> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct SplitRunner;

    #[async_trait]
    impl SubTaskRunner for SplitRunner {
        async fn run_sub_task(&self, task: SubTask) -> Result<String, OrchError> {
            if task.task.contains("fail") {
                Err(OrchError::SubTaskFailed {
                    sub_task: task.id.to_string(),
                    message: "boom".into(),
                })
            } else {
                Ok(format!("OK {}", task.task))
            }
        }
    }

    fn models(planner: &str, judge: &str, responder: &str) -> OrchModels {
        OrchModels {
            planner: Arc::new(ScriptedModel::new(vec![planner])),
            judge: Arc::new(ScriptedModel::new(vec![judge])),
            responder: Arc::new(ScriptedModel::new(vec![responder])),
        }
    }

    #[tokio::test]
    async fn single_iteration_when_judge_is_immediately_sufficient() {
        let plan = r#"[{"id":"1","task":"find BFS prereqs"}]"#;
        let model_set = models(plan, "SUFFICIENT", "BFS uses a queue.");
        let runner: Arc<dyn SubTaskRunner> = Arc::new(SplitRunner);
        let mut turn = TurnState::new("what is BFS?", "", 3);
        let sink = NullSink;
        let config = OrchestratorConfig::default();

        run_turn(&model_set, &config, runner, &mut turn, &sink).await.unwrap();

        assert_eq!(turn.iteration, 1);
        assert_eq!(turn.final_answer.as_deref(), Some("BFS uses a queue."));
    }

    #[tokio::test]
    async fn iteration_ceiling_forces_respond_after_max_plans() {
        // Every Judge call always returns INSUFFICIENT.
        let model_set = OrchModels {
            planner: Arc::new(ScriptedModel::new(vec![
                r#"[{"id":"1","task":"a"}]"#,
                r#"[{"id":"1","task":"a"}]"#,
                r#"[{"id":"1","task":"a"}]"#,
            ])),
            judge: Arc::new(ScriptedModel::new(vec![
                "INSUFFICIENT: need more",
                "INSUFFICIENT: need more",
                "INSUFFICIENT: need more",
            ])),
            responder: Arc::new(ScriptedModel::new(vec!["here is what we found"])),
        };
        let runner: Arc<dyn SubTaskRunner> = Arc::new(SplitRunner);
        let mut turn = TurnState::new("what is BFS?", "", 3);
        let sink = CollectingSink::new();
        let config = OrchestratorConfig::default();

        run_turn(&model_set, &config, runner, &mut turn, &sink).await.unwrap();

        assert_eq!(turn.iteration, 3);
        assert!(turn.final_answer.is_some());

        let iterations: Vec<u32> = sink
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                StreamEvent::State { iteration, .. } => Some(*iteration),
                _ => None,
            })
            .collect();
        // Strictly increasing across the three plan/execute/aggregate/judge cycles.
        assert!(iterations.windows(2).all(|w| w[1] >= w[0]));
        assert!(iterations.contains(&1));
        assert!(iterations.contains(&2));
        assert!(iterations.contains(&3));
    }

    #[tokio::test]
    async fn sub_task_isolation_one_failure_does_not_abort_turn() {
        let plan = r#"[{"id":"1","task":"will fail"},{"id":"2","task":"OK result"}]"#;
        let model_set = models(plan, "SUFFICIENT", "final answer");
        let runner: Arc<dyn SubTaskRunner> = Arc::new(SplitRunner);
        let mut turn = TurnState::new("q", "", 1);
        let sink = NullSink;
        let config = OrchestratorConfig::default();

        run_turn(&model_set, &config, runner, &mut turn, &sink).await.unwrap();

        assert_eq!(turn.intermediate_results.len(), 2);
        assert!(turn.intermediate_results[0].contains("ERROR"));
        assert!(turn.intermediate_results[1].contains("OK result"));
        assert!(turn.todos.iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[tokio::test]
    async fn empty_responder_output_falls_back_to_apology() {
        let plan = r#"[{"id":"1","task":"a"}]"#;
        let model_set = models(plan, "SUFFICIENT", "");
        let runner: Arc<dyn SubTaskRunner> = Arc::new(SplitRunner);
        let mut turn = TurnState::new("q", "", 1);
        let sink = NullSink;
        let config = OrchestratorConfig::default();

        run_turn(&model_set, &config, runner, &mut turn, &sink).await.unwrap();

        assert_eq!(turn.final_answer.as_deref(), Some(APOLOGY_TEXT));
    }

    #[tokio::test]
    async fn subtask_status_events_are_emitted_in_progress_then_completed_pairs() {
        let plan = r#"[{"id":"1","task":"a"},{"id":"2","task":"b"}]"#;
        let model_set = models(plan, "SUFFICIENT", "done");
        let runner: Arc<dyn SubTaskRunner> = Arc::new(SplitRunner);
        let mut turn = TurnState::new("q", "", 1);
        let sink = CollectingSink::new();
        let config = OrchestratorConfig::default();

        run_turn(&model_set, &config, runner, &mut turn, &sink).await.unwrap();

        let in_progress = count_status(&sink, "in_progress");
        let completed = count_status(&sink, "completed");
        assert_eq!(in_progress, 2);
        assert_eq!(completed, 2);
    }

    fn count_status(sink: &CollectingSink, status: &str) -> usize {
        sink.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, StreamEvent::Custom(CustomEvent::SubtaskStatus { status: s, .. }) if s == status))
            .count()
    }
}
