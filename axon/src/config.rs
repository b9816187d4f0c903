//! Runtime configuration surface (spec §6 "Configuration surface").
//!
//! A single [`Config`] struct carries every knob the orchestrator,
//! sub-agent runner, and ingestion pipeline consume. Layering follows the
//! teacher's manual override pattern (`axon_turn::ModelDefaults::build_request`):
//! [`Config::default`] gives sane defaults, [`Config::from_env`] overlays
//! environment variables on top, matching the teacher's own lack of a
//! config-file crate dependency (`neuron-turn` reads provider keys straight
//! from the environment).

use std::path::PathBuf;
use std::time::Duration;

/// Endpoint/credential fields for one model role (reasoning, fast, embedding).
#[derive(Debug, Clone, Default)]
pub struct ModelRoleConfig {
    /// Which provider backs this role: `"anthropic"`, `"openai"`, or `"ollama"`.
    pub provider: String,
    /// Model identifier passed to the provider.
    pub model: String,
    /// API key, if the provider requires one.
    pub api_key: Option<String>,
}

/// Every knob in spec.md §6's configuration surface, plus the model
/// endpoints each role talks to.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token-window size the chunker uses (default 512).
    pub chunk_size: usize,
    /// Token overlap between consecutive chunks (default 64).
    pub chunk_overlap: usize,
    /// How many chunks the semantic search tool returns (default 8).
    pub top_k: usize,
    /// Planner iteration ceiling before a forced respond (default 3).
    pub max_iterations: u32,
    /// Sub-task fan-out concurrency cap (default 3).
    pub agent_concurrency: usize,
    /// Per-chunk/per-call model concurrency cap (default 50).
    pub llm_concurrency: usize,
    /// Store read/write concurrency cap (default 16).
    pub storage_concurrency: usize,
    /// Per-document ingestion concurrency cap (default 25).
    pub file_concurrency: usize,
    /// Per-call model request timeout (default 600s).
    pub llm_request_timeout: Duration,
    /// How many recent dialogue rounds the Planner sees (default 5).
    pub session_history_rounds: usize,
    /// Reasoning-tier model (Planner/Judge/Responder).
    pub reasoning_model: ModelRoleConfig,
    /// Fast-tier model (sub-agent step loop).
    pub fast_model: ModelRoleConfig,
    /// Embedding-tier model, if the vector store needs one beyond hashing.
    pub embedding_model: ModelRoleConfig,
    /// Root directory for the filesystem-backed session store. `None`
    /// selects the in-memory adapter (spec §1 "ships in-memory/filesystem
    /// reference adapters for each").
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
            top_k: 8,
            max_iterations: 3,
            agent_concurrency: 3,
            llm_concurrency: 50,
            storage_concurrency: 16,
            file_concurrency: 25,
            llm_request_timeout: Duration::from_secs(600),
            session_history_rounds: 5,
            reasoning_model: ModelRoleConfig { provider: "anthropic".into(), model: String::new(), api_key: None },
            fast_model: ModelRoleConfig { provider: "anthropic".into(), model: String::new(), api_key: None },
            embedding_model: ModelRoleConfig { provider: "anthropic".into(), model: String::new(), api_key: None },
            state_dir: None,
        }
    }
}

impl Config {
    /// Overlay `AXON_*` environment variables on top of [`Config::default`].
    /// Any variable that's absent or fails to parse is left at its default
    /// rather than erroring — this is a convenience overlay, not a strict
    /// schema.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_usize("AXON_CHUNK_SIZE") {
            config.chunk_size = v;
        }
        if let Some(v) = env_usize("AXON_CHUNK_OVERLAP") {
            config.chunk_overlap = v;
        }
        if let Some(v) = env_usize("AXON_TOP_K") {
            config.top_k = v;
        }
        if let Some(v) = env_usize("AXON_MAX_ITERATIONS") {
            config.max_iterations = v as u32;
        }
        if let Some(v) = env_usize("AXON_AGENT_CONCURRENCY") {
            config.agent_concurrency = v;
        }
        if let Some(v) = env_usize("AXON_LLM_CONCURRENCY") {
            config.llm_concurrency = v;
        }
        if let Some(v) = env_usize("AXON_STORAGE_CONCURRENCY") {
            config.storage_concurrency = v;
        }
        if let Some(v) = env_usize("AXON_FILE_CONCURRENCY") {
            config.file_concurrency = v;
        }
        if let Some(v) = env_usize("AXON_LLM_REQUEST_TIMEOUT_SECS") {
            config.llm_request_timeout = Duration::from_secs(v as u64);
        }
        if let Some(v) = env_usize("AXON_SESSION_HISTORY_ROUNDS") {
            config.session_history_rounds = v;
        }
        if let Ok(v) = std::env::var("AXON_STATE_DIR") {
            config.state_dir = Some(PathBuf::from(v));
        }

        overlay_role(&mut config.reasoning_model, "AXON_REASONING");
        overlay_role(&mut config.fast_model, "AXON_FAST");
        overlay_role(&mut config.embedding_model, "AXON_EMBEDDING");

        config
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn overlay_role(role: &mut ModelRoleConfig, prefix: &str) {
    if let Ok(provider) = std::env::var(format!("{prefix}_PROVIDER")) {
        role.provider = provider;
    }
    if let Ok(model) = std::env::var(format!("{prefix}_MODEL")) {
        role.model = model;
    }
    if let Ok(api_key) = std::env::var(format!("{prefix}_API_KEY")) {
        role.api_key = Some(api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.agent_concurrency, 3);
        assert_eq!(config.llm_concurrency, 50);
        assert_eq!(config.file_concurrency, 25);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.llm_request_timeout, Duration::from_secs(600));
    }

    #[test]
    fn from_env_overlays_only_present_vars() {
        // SAFETY: test runs single-threaded within this process and the var
        // is cleared immediately after reading it.
        unsafe {
            std::env::set_var("AXON_CHUNK_SIZE", "256");
        }
        let config = Config::from_env();
        unsafe {
            std::env::remove_var("AXON_CHUNK_SIZE");
        }
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.chunk_overlap, 64); // untouched default
    }
}
