#![deny(missing_docs)]
//! OpenAI Chat Completions adapter implementing [`axon_turn::ChatModel`].

mod types;

use async_trait::async_trait;
use axon_turn::{
    ChatModel, ContentPart, DeltaScope, DeltaStream, ImageSource, ProviderError, ProviderMessage, ProviderRequest,
    ProviderResponse, Role, StopReason, StreamDelta, TokenUsage,
};
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;
use types::*;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI API adapter. One instance per API key; cheap to clone the
/// underlying `reqwest::Client`, so construct once and share behind an `Arc`.
pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    api_url: String,
    org_id: Option<String>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            org_id: None,
        }
    }

    /// Override the API URL (for testing or proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the OpenAI-Organization header for multi-org accounts.
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    fn embeddings_url(&self) -> String {
        self.api_url.replace("/chat/completions", "/embeddings")
    }

    fn build_request(&self, request: &ProviderRequest, stream: bool) -> OpenAIRequest {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());
        let max_tokens = request.max_tokens;

        let mut messages: Vec<OpenAIMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(OpenAIMessage {
                role: "system".into(),
                content: Some(OpenAIContent::Text(system.clone())),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for m in &request.messages {
            match m.role {
                Role::System => {
                    let text = extract_text(&m.content);
                    messages.push(OpenAIMessage {
                        role: "system".into(),
                        content: Some(OpenAIContent::Text(text)),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
                Role::User => {
                    let mut tool_results = Vec::new();
                    let mut other_parts = Vec::new();
                    for part in &m.content {
                        match part {
                            ContentPart::ToolResult { tool_use_id, content, .. } => {
                                tool_results.push((tool_use_id.clone(), content.clone()));
                            }
                            _ => other_parts.push(part.clone()),
                        }
                    }

                    for (tool_call_id, content) in tool_results {
                        messages.push(OpenAIMessage {
                            role: "tool".into(),
                            content: Some(OpenAIContent::Text(content)),
                            tool_calls: None,
                            tool_call_id: Some(tool_call_id),
                        });
                    }

                    if !other_parts.is_empty() {
                        messages.push(OpenAIMessage {
                            role: "user".into(),
                            content: Some(parts_to_openai_content(&other_parts)),
                            tool_calls: None,
                            tool_call_id: None,
                        });
                    }
                }
                Role::Assistant => {
                    let mut tool_calls = Vec::new();
                    let mut text_parts = Vec::new();
                    for part in &m.content {
                        match part {
                            ContentPart::ToolUse { id, name, input } => {
                                tool_calls.push(OpenAIToolCall {
                                    id: id.clone(),
                                    call_type: "function".into(),
                                    function: OpenAIFunctionCall {
                                        name: name.clone(),
                                        arguments: serde_json::to_string(input).unwrap_or_default(),
                                    },
                                });
                            }
                            _ => text_parts.push(part.clone()),
                        }
                    }

                    let content = if text_parts.is_empty() {
                        None
                    } else {
                        Some(parts_to_openai_content(&text_parts))
                    };
                    let tool_calls_field = if tool_calls.is_empty() { None } else { Some(tool_calls) };

                    messages.push(OpenAIMessage {
                        role: "assistant".into(),
                        content,
                        tool_calls: tool_calls_field,
                        tool_call_id: None,
                    });
                }
            }
        }

        let tools: Vec<OpenAITool> = request
            .tools
            .iter()
            .map(|t| OpenAITool {
                tool_type: "function".into(),
                function: OpenAIFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect();

        let service_tier = request.extra.get("service_tier").and_then(|v| v.as_str()).map(String::from);
        let reasoning_effort = request.extra.get("reasoning_effort").and_then(|v| v.as_str()).map(String::from);
        let parallel_tool_calls = request.extra.get("parallel_tool_calls").and_then(|v| v.as_bool());

        OpenAIRequest {
            model,
            messages,
            max_tokens,
            temperature: request.temperature,
            tools,
            parallel_tool_calls,
            service_tier,
            reasoning_effort,
            stream,
            stream_options: if stream { Some(OpenAIStreamOptions { include_usage: true }) } else { None },
        }
    }

    fn parse_response(&self, response: OpenAIResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;

        let mut content: Vec<ContentPart> = Vec::new();

        if let Some(msg_content) = choice.message.content {
            match msg_content {
                OpenAIContent::Text(text) => {
                    if !text.is_empty() {
                        content.push(ContentPart::Text { text });
                    }
                }
                OpenAIContent::Parts(parts) => {
                    for part in parts {
                        match part {
                            OpenAIContentPart::Text { text } => content.push(ContentPart::Text { text }),
                            OpenAIContentPart::ImageUrl { image_url } => content.push(ContentPart::Image {
                                source: ImageSource::Url { url: image_url.url },
                                media_type: "image/png".into(),
                            }),
                        }
                    }
                }
            }
        }

        if let Some(tool_calls) = choice.message.tool_calls {
            for tc in tool_calls {
                let input: serde_json::Value = serde_json::from_str(&tc.function.arguments).unwrap_or_default();
                content.push(ContentPart::ToolUse { id: tc.id, name: tc.function.name, input });
            }
        }

        let stop_reason = match choice.finish_reason.as_str() {
            "stop" => StopReason::EndTurn,
            "tool_calls" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            "content_filter" => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        };

        let usage = TokenUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
            cache_read_tokens: response.usage.prompt_tokens_details.and_then(|d| d.cached_tokens),
            cache_creation_tokens: None,
        };

        let cost = estimate_cost(&response.model, &usage);

        Ok(ProviderResponse {
            content,
            reasoning: None,
            stop_reason,
            usage,
            model: response.model,
            cost: Some(cost),
            truncated: None,
        })
    }

    async fn send(&self, api_request: &OpenAIRequest) -> Result<reqwest::Response, ProviderError> {
        let mut http_request = self
            .client
            .post(&self.api_url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(ref org_id) = self.org_id {
            http_request = http_request.header("openai-organization", org_id);
        }

        let http_response = http_request.json(api_request).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(Duration::from_secs(600))
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = http_response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthFailed(body));
        }
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!("HTTP {status}: {body}")));
        }
        Ok(http_response)
    }

    /// Generate embeddings for `texts` via `POST /v1/embeddings`.
    ///
    /// Used by `axon-retrieval`'s vector store when it needs to embed
    /// content it wasn't given a precomputed vector for.
    pub async fn embed(&self, texts: &[String], dimensions: Option<u32>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = OpenAIEmbeddingRequest {
            model: DEFAULT_EMBEDDING_MODEL.into(),
            input: texts.to_vec(),
            encoding_format: "float",
            dimensions,
        };

        tracing::debug!(count = texts.len(), model = DEFAULT_EMBEDDING_MODEL, "requesting embeddings");

        let mut http_request = self
            .client
            .post(self.embeddings_url())
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");
        if let Some(ref org_id) = self.org_id {
            http_request = http_request.header("openai-organization", org_id);
        }

        let http_response =
            http_request.json(&body).send().await.map_err(|e| EmbeddingError::Network(Box::new(e)))?;

        let status = http_response.status();
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(map_embedding_http_status(status, &body));
        }

        let mut api_response: OpenAIEmbeddingResponse =
            http_response.json().await.map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        api_response.data.sort_by_key(|d| d.index);
        Ok(api_response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl ChatModel for OpenAIProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = self.build_request(&request, false);
        let http_response = self.send(&api_request).await?;
        let api_response: OpenAIResponse =
            http_response.json().await.map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        self.parse_response(api_response)
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, ProviderError> {
        let api_request = self.build_request(&request, true);
        let http_response = self.send(&api_request).await?;

        let byte_stream = http_response.bytes_stream();
        let events = sse_lines(byte_stream);

        let delta_stream = async_stream::try_stream! {
            futures::pin_mut!(events);
            while let Some(line) = futures::StreamExt::next(&mut events).await {
                let line = line?;
                let Some(payload) = line.strip_prefix("data: ") else { continue };
                if payload == "[DONE]" {
                    break;
                }
                let chunk: OpenAIStreamChunk = serde_json::from_str(payload)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                for choice in chunk.choices {
                    if let Some(text) = choice.delta.content {
                        yield StreamDelta { scope: DeltaScope::Content, text };
                    }
                    if let Some(text) = choice.delta.reasoning_content {
                        yield StreamDelta { scope: DeltaScope::Reasoning, text };
                    }
                }
            }
        };

        Ok(Box::pin(delta_stream))
    }

    fn model_name(&self) -> &str {
        DEFAULT_MODEL
    }
}

/// Split a byte stream into `\n`-terminated lines, tolerating chunk
/// boundaries that split a line across two reads.
fn sse_lines(
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

fn estimate_cost(model: &str, usage: &TokenUsage) -> Decimal {
    // Per-million-token rates, USD. Unrecognized models fall back to the
    // gpt-4o-mini rate, the family this adapter defaults to.
    let (input_rate, output_rate) = if model.contains("gpt-4o-mini") {
        (Decimal::new(15, 2), Decimal::new(60, 2))
    } else if model.contains("gpt-4o") {
        (Decimal::new(250, 2), Decimal::new(1000, 2))
    } else if model.starts_with("o1") || model.starts_with("o3") {
        (Decimal::new(15, 0), Decimal::new(60, 0))
    } else {
        (Decimal::new(15, 2), Decimal::new(60, 2))
    };
    let input_cost = Decimal::from(usage.input_tokens) * input_rate / Decimal::from(1_000_000);
    let output_cost = Decimal::from(usage.output_tokens) * output_rate / Decimal::from(1_000_000);
    input_cost + output_cost
}

fn extract_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parts_to_openai_content(parts: &[ContentPart]) -> OpenAIContent {
    if parts.len() == 1 {
        if let ContentPart::Text { text } = &parts[0] {
            return OpenAIContent::Text(text.clone());
        }
    }
    OpenAIContent::Parts(parts.iter().filter_map(content_part_to_openai_part).collect())
}

fn content_part_to_openai_part(part: &ContentPart) -> Option<OpenAIContentPart> {
    match part {
        ContentPart::Text { text } => Some(OpenAIContentPart::Text { text: text.clone() }),
        ContentPart::Image { source, .. } => {
            let url = match source {
                ImageSource::Url { url } => url.clone(),
                ImageSource::Base64 { data } => format!("data:image/png;base64,{data}"),
            };
            Some(OpenAIContentPart::ImageUrl { image_url: OpenAIImageUrl { url } })
        }
        _ => None,
    }
}

/// Errors from the Embeddings API, kept distinct from [`ProviderError`]
/// since embedding calls are not part of the `ChatModel` boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP or network request failed.
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Provider rate-limited the request.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested wait, if the provider reported one.
        retry_after: Option<Duration>,
    },
    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    Authentication(String),
    /// The request itself was rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Could not parse the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl EmbeddingError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::RateLimit { .. } | EmbeddingError::Network(_))
    }
}

fn map_embedding_http_status(status: reqwest::StatusCode, body: &str) -> EmbeddingError {
    match status.as_u16() {
        401 | 403 => EmbeddingError::Authentication(body.to_string()),
        429 => EmbeddingError::RateLimit { retry_after: parse_retry_after(body) },
        400 | 404 => EmbeddingError::InvalidRequest(body.to_string()),
        _ => EmbeddingError::Other(format!("HTTP {status}: {body}").into()),
    }
}

/// OpenAI sometimes includes "Please retry after X seconds" in the error
/// message; best-effort parse, `None` if no delay can be extracted.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let idx = lower.find("retry after ")?;
    let after = &lower[idx + 12..];
    let num_str: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
    num_str.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_turn::{Role as R, ToolSchema};
    use serde_json::json;

    fn bare_request() -> ProviderRequest {
        ProviderRequest {
            model: None,
            messages: vec![],
            tools: vec![],
            max_tokens: None,
            temperature: None,
            system: None,
            timeout: None,
            extra: json!(null),
        }
    }

    #[test]
    fn build_simple_request() {
        let provider = OpenAIProvider::new("test-key");
        let mut request = bare_request();
        request.model = Some("gpt-4o-mini".into());
        request.messages = vec![ProviderMessage { role: R::User, content: vec![ContentPart::Text { text: "Hello".into() }] }];
        request.max_tokens = Some(256);
        request.system = Some("Be helpful.".into());

        let api_request = provider.build_request(&request, false);
        assert_eq!(api_request.model, "gpt-4o-mini");
        assert_eq!(api_request.max_tokens, Some(256));
        assert_eq!(api_request.messages.len(), 2);
        assert_eq!(api_request.messages[0].role, "system");
        assert_eq!(api_request.messages[1].role, "user");
        assert!(!api_request.stream);
    }

    #[test]
    fn stream_flag_sets_stream_options() {
        let provider = OpenAIProvider::new("test-key");
        let api_request = provider.build_request(&bare_request(), true);
        assert!(api_request.stream);
        assert!(api_request.stream_options.is_some());
    }

    #[test]
    fn parse_simple_response() {
        let provider = OpenAIProvider::new("test-key");
        let api_response = OpenAIResponse {
            id: "chatcmpl-123".into(),
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".into(),
                    content: Some(OpenAIContent::Text("Hello!".into())),
                    tool_calls: None,
                    tool_call_id: None,
                },
                finish_reason: "stop".into(),
                index: 0,
            }],
            model: "gpt-4o-mini".into(),
            usage: OpenAIUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
                prompt_tokens_details: None,
                completion_tokens_details: None,
            },
            service_tier: None,
        };

        let response = provider.parse_response(api_response).unwrap();
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, 10);
        assert!(response.cost.is_some());
        assert_eq!(response.content.len(), 1);
    }

    #[test]
    fn parse_tool_use_response() {
        let provider = OpenAIProvider::new("test-key");
        let api_response = OpenAIResponse {
            id: "chatcmpl-456".into(),
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![OpenAIToolCall {
                        id: "call_1".into(),
                        call_type: "function".into(),
                        function: OpenAIFunctionCall { name: "search_chunks".into(), arguments: r#"{"query": "bfs"}"#.into() },
                    }]),
                    tool_call_id: None,
                },
                finish_reason: "tool_calls".into(),
                index: 0,
            }],
            model: "gpt-4o-mini".into(),
            usage: OpenAIUsage {
                prompt_tokens: 20,
                completion_tokens: 30,
                total_tokens: 50,
                prompt_tokens_details: None,
                completion_tokens_details: None,
            },
            service_tier: None,
        };

        let response = provider.parse_response(api_response).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        match &response.content[0] {
            ContentPart::ToolUse { name, .. } => assert_eq!(name, "search_chunks"),
            _ => panic!("expected ToolUse"),
        }
    }

    #[test]
    fn default_model_is_gpt4o_mini() {
        let provider = OpenAIProvider::new("test-key");
        let api_request = provider.build_request(&bare_request(), false);
        assert_eq!(api_request.model, "gpt-4o-mini");
    }

    #[test]
    fn gpt4o_pricing_exceeds_mini_pricing() {
        let usage = TokenUsage { input_tokens: 1000, output_tokens: 1000, cache_read_tokens: None, cache_creation_tokens: None };
        let mini = estimate_cost("gpt-4o-mini", &usage);
        let full = estimate_cost("gpt-4o", &usage);
        assert!(full > mini);
    }

    #[test]
    fn tool_schema_serializes() {
        let tool = OpenAITool {
            tool_type: "function".into(),
            function: OpenAIFunction {
                name: "get_weather".into(),
                description: "Get current weather".into(),
                parameters: json!({"type": "object", "properties": {"location": {"type": "string"}}, "required": ["location"]}),
            },
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_weather");
    }

    #[test]
    fn tool_from_schema_roundtrips_name() {
        let schema = ToolSchema { name: "search_chunks".into(), description: "desc".into(), input_schema: json!({}) };
        let mut request = bare_request();
        request.tools = vec![schema];
        let provider = OpenAIProvider::new("test-key");
        let api_request = provider.build_request(&request, false);
        assert_eq!(api_request.tools[0].function.name, "search_chunks");
    }

    #[test]
    fn tool_result_becomes_tool_role_message() {
        let provider = OpenAIProvider::new("test-key");
        let mut request = bare_request();
        request.messages = vec![
            ProviderMessage {
                role: R::Assistant,
                content: vec![ContentPart::ToolUse { id: "call_1".into(), name: "bash".into(), input: json!({"command": "ls"}) }],
            },
            ProviderMessage {
                role: R::User,
                content: vec![ContentPart::ToolResult { tool_use_id: "call_1".into(), content: "file.txt".into(), is_error: false }],
            },
        ];

        let api_request = provider.build_request(&request, false);
        assert_eq!(api_request.messages[0].role, "assistant");
        assert!(api_request.messages[0].tool_calls.is_some());
        assert_eq!(api_request.messages[1].role, "tool");
        assert_eq!(api_request.messages[1].tool_call_id, Some("call_1".into()));
    }

    #[test]
    fn with_url_overrides_api_url_and_embeddings_url() {
        let provider = OpenAIProvider::new("test-key").with_url("http://localhost:9999/v1/chat/completions");
        assert_eq!(provider.api_url, "http://localhost:9999/v1/chat/completions");
        assert_eq!(provider.embeddings_url(), "http://localhost:9999/v1/embeddings");
    }

    #[test]
    fn model_name_reports_default() {
        let provider = OpenAIProvider::new("test-key");
        assert_eq!(ChatModel::model_name(&provider), DEFAULT_MODEL);
    }

    #[test]
    fn map_401_to_authentication() {
        let err = map_embedding_http_status(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, EmbeddingError::Authentication(_)));
    }

    #[test]
    fn map_429_to_rate_limit_is_retryable() {
        let err = map_embedding_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "Please retry after 30 seconds");
        assert!(err.is_retryable());
        match err {
            EmbeddingError::RateLimit { retry_after } => assert_eq!(retry_after, Some(Duration::from_secs(30))),
            _ => panic!("expected RateLimit"),
        }
    }

    #[test]
    fn map_400_to_invalid_request_not_retryable() {
        let err = map_embedding_http_status(reqwest::StatusCode::BAD_REQUEST, "bad request");
        assert!(matches!(err, EmbeddingError::InvalidRequest(_)));
        assert!(!err.is_retryable());
    }
}
