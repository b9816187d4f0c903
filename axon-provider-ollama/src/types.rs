//! Ollama `/api/chat` request/response wire types.
//!
//! Key differences from the Anthropic/OpenAI adapters: no auth headers, cost
//! is always zero (local inference), and streaming is newline-delimited JSON
//! objects rather than an `event:`/`data:` SSE frame — each line is itself a
//! complete `OllamaResponse`, with `done: false` meaning "more to come".

use serde::{Deserialize, Serialize};

/// Ollama `/api/chat` request body.
#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    /// Model identifier (e.g. "llama3.2:1b").
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OllamaMessage>,
    /// Whether to stream the response.
    pub stream: bool,
    /// How long to keep the model loaded in memory (e.g. "5m", "0").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Hardware tuning and generation options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// A message in the Ollama `/api/chat` format.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct OllamaMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Message text content.
    pub content: String,
}

/// Hardware tuning and generation options for Ollama.
#[derive(Debug, Default, Serialize)]
pub struct OllamaOptions {
    /// Sampling temperature (0.0 - 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Ollama `/api/chat` response body. In streaming mode, every line on the
/// wire deserializes to one of these; `done: true` marks the final line and
/// carries the aggregate counters.
#[derive(Debug, Default, Deserialize)]
pub struct OllamaResponse {
    /// Model that generated the response.
    #[serde(default)]
    pub model: String,
    /// The assistant's response message (or delta, in streaming mode).
    #[serde(default)]
    pub message: OllamaMessage,
    /// Whether the response is complete.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped (e.g. "stop", "length").
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Number of tokens in the prompt. Present on the final `done` line.
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Number of tokens generated. Present on the final `done` line.
    #[serde(default)]
    pub eval_count: Option<u64>,
}
