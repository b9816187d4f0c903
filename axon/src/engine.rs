//! The assembled system (spec §1/§2): owns every collaborator the
//! Orchestrator and sub-agent runner need, and exposes one [`Engine::ask`]
//! entry point that drives a full user turn end to end, loading and
//! persisting dialogue history through a [`StateStore`].
//!
//! Mirrors the teacher's composition-root pattern (`neuron::AgentLoop`
//! assembled from a `Provider`, a `ToolRegistry`, and a `ContextStrategy`
//! at the call site) generalized to the five-collaborator shape this
//! orchestrator needs: three model roles, a tool registry, and a session
//! store.

use std::sync::Arc;

use axon_context::SlidingWindowStrategy;
use axon_core::state::{StateScope, StateStore};
use axon_core::stream::EventSink;
use axon_core::{Message, OrchError, SessionId, SubTaskRunner, TurnState};
use axon_hooks::HookRegistry;
use axon_orch::{run_turn, OrchModels, OrchestratorConfig};
use axon_subagent::{SubAgentConfig, SubAgentRunner};
use axon_tool::ToolRegistry;
use axon_turn::{ChatModel, ModelDefaults};
use thiserror::Error;

use crate::config::Config;
use crate::wiring::{build_chat_model, build_in_memory_stores, build_state_store, build_tool_registry, WiringError};

/// The key under which a session's dialogue history is persisted (spec §1
/// "session persistence ... is a collaborator the core treats as opaque" —
/// here the in-crate reference adapter, not a real session service).
const HISTORY_KEY: &str = "messages";

/// Errors constructing or driving the [`Engine`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to build a collaborator from [`Config`].
    #[error(transparent)]
    Wiring(#[from] WiringError),
    /// The turn itself failed (spec §7 "uncaught exception ... terminates
    /// the turn with a generic error on the transport").
    #[error(transparent)]
    Turn(#[from] OrchError),
}

/// The assembled orchestration core: three model roles, the tool registry,
/// and the session store, built once from a [`Config`] and reused across
/// turns. The sub-agent runner itself is built fresh per [`Engine::ask`]
/// call (see that method's doc comment for why).
pub struct Engine {
    config: Config,
    orch_models: OrchModels,
    orch_config: OrchestratorConfig,
    fast_model: Arc<dyn ChatModel>,
    fast_defaults: ModelDefaults,
    tools: Arc<ToolRegistry>,
    hooks: Arc<HookRegistry>,
    sub_agent_config: SubAgentConfig,
    state_store: Arc<dyn StateStore>,
}

impl Engine {
    /// Build every collaborator from `config`: model roles, the retrieval
    /// tool registry, and the session store.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let reasoning_model = build_chat_model(&config.reasoning_model)?;
        let fast_model = build_chat_model(&config.fast_model)?;

        let (vector_store, graph_store) = build_in_memory_stores();
        let tools = build_tool_registry(&config, Arc::clone(&reasoning_model), vector_store, graph_store, None);
        let hooks = Arc::new(HookRegistry::new());

        let fast_defaults = ModelDefaults {
            model: config.fast_model.model.clone(),
            timeout: config.llm_request_timeout,
            ..ModelDefaults::default()
        };

        let orch_models = OrchModels {
            planner: Arc::clone(&reasoning_model),
            judge: Arc::clone(&reasoning_model),
            responder: reasoning_model,
        };
        let orch_config = OrchestratorConfig {
            agent_concurrency: config.agent_concurrency,
            session_history_rounds: config.session_history_rounds,
        };
        let state_store = build_state_store(config.state_dir.as_deref());

        Ok(Self {
            config,
            orch_models,
            orch_config,
            fast_model,
            fast_defaults,
            tools,
            hooks,
            sub_agent_config: SubAgentConfig::default(),
            state_store,
        })
    }

    /// Run one user turn to completion: load `session_id`'s prior dialogue
    /// history, append `question`, drive `axon_orch::run_turn`, and persist
    /// the resulting message log back to the session store.
    ///
    /// A fresh [`SubAgentRunner`] is built for this call alone, bound to
    /// `sink`: `SubTaskRunner::run_sub_task` takes no per-call sink
    /// parameter, so the only way for a sub-task's tool-call events to
    /// reach the caller's own stream (rather than some other request's) is
    /// to construct the runner per turn instead of once in [`Engine::new`].
    /// Every other collaborator it needs (model, tools, hooks) is already
    /// `Arc`-shared and cheap to clone.
    pub async fn ask(
        &self,
        sink: Arc<dyn EventSink>,
        session_id: &SessionId,
        question: &str,
        user_profile: &str,
    ) -> Result<TurnState, EngineError> {
        let sub_task_runner: Arc<dyn SubTaskRunner> = Arc::new(SubAgentRunner::new(
            Arc::clone(&self.fast_model),
            self.fast_defaults.clone(),
            Arc::clone(&self.tools),
            Arc::clone(&self.hooks),
            Box::new(SlidingWindowStrategy),
            sink.clone(),
            self.sub_agent_config.clone(),
        ));

        let scope = StateScope::Session(session_id.clone());
        let history = self
            .state_store
            .read(&scope, HISTORY_KEY)
            .await
            .map_err(OrchError::from)?;
        let mut messages: Vec<Message> = history.and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default();
        messages.push(Message::user(question));

        let mut turn = TurnState::new(question, user_profile, self.config.max_iterations);
        turn.messages = messages;

        run_turn(&self.orch_models, &self.orch_config, sub_task_runner, &mut turn, sink.as_ref()).await?;

        let serialized = serde_json::to_value(&turn.messages).unwrap_or(serde_json::Value::Null);
        self.state_store
            .write(&scope, HISTORY_KEY, serialized)
            .await
            .map_err(OrchError::from)?;

        Ok(turn)
    }
}
