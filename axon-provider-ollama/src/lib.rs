#![deny(missing_docs)]
//! Ollama local-model adapter implementing [`axon_turn::ChatModel`].
//!
//! Ollama has no tool-calling or reasoning channel support in the
//! `/api/chat` endpoint this adapter targets, so `reasoning` is always
//! `None` and `request.tools` is ignored — matching the sub-agent runner's
//! own use of the textual Action protocol rather than provider-native tool
//! calls (spec §4.3). Cost is always zero since inference is local.

mod types;

use async_trait::async_trait;
use axon_turn::{
    ChatModel, ContentPart, DeltaScope, DeltaStream, ProviderError, ProviderRequest, ProviderResponse, Role,
    StopReason, StreamDelta, TokenUsage,
};
use rust_decimal::Decimal;
use std::time::Duration;
use types::*;

const DEFAULT_MODEL: &str = "llama3.2:1b";

/// Ollama local model adapter. Cheap to clone the underlying
/// `reqwest::Client`, so construct once and share behind an `Arc`.
pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    keep_alive: Option<String>,
}

impl OllamaProvider {
    /// Create a new adapter pointed at the default local endpoint
    /// (`http://localhost:11434/api/chat`).
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: "http://localhost:11434/api/chat".into(),
            keep_alive: None,
        }
    }

    /// Override the API URL (for remote Ollama instances or custom ports).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set how long Ollama keeps the model resident after this call.
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    fn build_request(&self, request: &ProviderRequest, stream: bool) -> OllamaRequest {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".into(),
                content: system.clone(),
            });
        }
        for m in &request.messages {
            messages.push(OllamaMessage {
                role: match m.role {
                    Role::System => "system".into(),
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                },
                content: text_of(&m.content),
            });
        }

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaRequest {
            model,
            messages,
            stream,
            keep_alive: self.keep_alive.clone(),
            options,
        }
    }

    fn parse_response(&self, response: OllamaResponse) -> ProviderResponse {
        let usage = TokenUsage {
            input_tokens: response.prompt_eval_count.unwrap_or(0),
            output_tokens: response.eval_count.unwrap_or(0),
            cache_read_tokens: None,
            cache_creation_tokens: None,
        };
        let stop_reason = match response.done_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        ProviderResponse {
            content: vec![ContentPart::Text {
                text: response.message.content,
            }],
            reasoning: None,
            stop_reason,
            usage,
            model: response.model,
            cost: Some(Decimal::ZERO),
            truncated: None,
        }
    }

    async fn send(&self, api_request: &OllamaRequest) -> Result<reqwest::Response, ProviderError> {
        let http_response = self
            .client
            .post(&self.api_url)
            .json(api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(Duration::from_secs(600))
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!("HTTP {status}: {body}")));
        }
        Ok(http_response)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for OllamaProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = self.build_request(&request, false);
        let http_response = self.send(&api_request).await?;
        let api_response: OllamaResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(self.parse_response(api_response))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ProviderError> {
        let api_request = self.build_request(&request, true);
        let http_response = self.send(&api_request).await?;

        let lines = ndjson_lines(http_response.bytes_stream());

        let delta_stream = async_stream::try_stream! {
            futures::pin_mut!(lines);
            while let Some(line) = futures::StreamExt::next(&mut lines).await {
                let line = line?;
                let chunk: OllamaResponse = serde_json::from_str(&line)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                if !chunk.message.content.is_empty() {
                    yield StreamDelta { scope: DeltaScope::Content, text: chunk.message.content };
                }
                if chunk.done {
                    break;
                }
            }
        };

        Ok(Box::pin(delta_stream))
    }

    fn model_name(&self) -> &str {
        DEFAULT_MODEL
    }
}

/// Split a byte stream into non-empty `\n`-terminated lines, tolerating
/// chunk boundaries that split a line across two reads. Ollama's streaming
/// format is one JSON object per line, not an SSE `data:` frame.
fn ndjson_lines(
    byte_stream: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> impl futures::Stream<Item = Result<String, ProviderError>> + Send + 'static {
    async_stream::try_stream! {
        futures::pin_mut!(byte_stream);
        let mut buf = String::new();
        while let Some(chunk) = futures::StreamExt::next(&mut byte_stream).await {
            let chunk = chunk.map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim_end_matches('\r').to_string();
                buf.drain(..=pos);
                if !line.is_empty() {
                    yield line;
                }
            }
        }
    }
}

/// Concatenate all `Text` parts of a message, ignoring tool-use/result/image
/// parts — Ollama's `/api/chat` has no equivalent content-block structure.
fn text_of(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}
