#![deny(missing_docs)]
//! Anthropic Messages API adapter implementing [`axon_turn::ChatModel`].

mod types;

use async_trait::async_trait;
use axon_turn::{
    ChatModel, ContentPart, DeltaScope, DeltaStream, ImageSource, ProviderError, ProviderMessage, ProviderRequest,
    ProviderResponse, Role, StopReason, StreamDelta, TokenUsage,
};
use rust_decimal::Decimal;
use std::time::Duration;
use types::*;

const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Anthropic API adapter. One instance per API key; cheap to clone the
/// underlying `reqwest::Client`, so construct once and share behind an `Arc`.
pub struct AnthropicProvider {
    api_key: String,
    client: reqwest::Client,
    api_url: String,
    api_version: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            api_url: "https://api.anthropic.com/v1/messages".into(),
            api_version: "2023-06-01".into(),
        }
    }

    /// Override the API URL (for testing or proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_request(&self, request: &ProviderRequest, stream: bool) -> AnthropicRequest {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());
        let max_tokens = request.max_tokens.unwrap_or(4096);

        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "user".into(),
                },
                content: parts_to_anthropic_content(&m.content),
            })
            .collect();

        let tools: Vec<AnthropicTool> = request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect();

        AnthropicRequest {
            model,
            max_tokens,
            messages,
            system: request.system.clone(),
            tools,
            temperature: request.temperature,
            stream,
        }
    }

    fn parse_response(&self, response: AnthropicResponse) -> ProviderResponse {
        let content: Vec<ContentPart> = response.content.iter().map(anthropic_block_to_content_part).collect();

        let stop_reason = match response.stop_reason.as_str() {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        let usage = TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            cache_read_tokens: response.usage.cache_read_input_tokens,
            cache_creation_tokens: response.usage.cache_creation_input_tokens,
        };

        let cost = estimate_cost(&response.model, &usage);

        ProviderResponse {
            content,
            reasoning: None,
            stop_reason,
            usage,
            model: response.model,
            cost: Some(cost),
            truncated: None,
        }
    }

    async fn send(&self, api_request: &AnthropicRequest) -> Result<reqwest::Response, ProviderError> {
        let http_response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
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
}

#[async_trait]
impl ChatModel for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let api_request = self.build_request(&request, false);
        let http_response = self.send(&api_request).await?;
        let api_response: AnthropicResponse = http_response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(self.parse_response(api_response))
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
                let event: AnthropicStreamEvent = serde_json::from_str(payload)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                match event {
                    AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                        AnthropicDelta::TextDelta { text } => {
                            yield StreamDelta { scope: DeltaScope::Content, text };
                        }
                        AnthropicDelta::ThinkingDelta { thinking } => {
                            yield StreamDelta { scope: DeltaScope::Reasoning, text: thinking };
                        }
                        AnthropicDelta::InputJsonDelta { .. } => {}
                    },
                    AnthropicStreamEvent::MessageStop => break,
                    _ => {}
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
    // Per-million-token rates, USD, as published for the Haiku/Sonnet/Opus
    // families. Unrecognized models fall back to Haiku pricing.
    let (input_rate, output_rate) = if model.contains("opus") {
        (Decimal::new(15, 0), Decimal::new(75, 0))
    } else if model.contains("sonnet") {
        (Decimal::new(3, 0), Decimal::new(15, 0))
    } else {
        (Decimal::new(25, 2), Decimal::new(125, 2))
    };
    let input_cost = Decimal::from(usage.input_tokens) * input_rate / Decimal::from(1_000_000);
    let output_cost = Decimal::from(usage.output_tokens) * output_rate / Decimal::from(1_000_000);
    input_cost + output_cost
}

fn parts_to_anthropic_content(parts: &[ContentPart]) -> AnthropicContent {
    if parts.len() == 1 {
        if let ContentPart::Text { text } = &parts[0] {
            return AnthropicContent::Text(text.clone());
        }
    }
    AnthropicContent::Blocks(parts.iter().map(content_part_to_anthropic_block).collect())
}

fn content_part_to_anthropic_block(part: &ContentPart) -> AnthropicContentBlock {
    match part {
        ContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
        ContentPart::ToolUse { id, name, input } => AnthropicContentBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        },
        ContentPart::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => AnthropicContentBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.clone(),
            is_error: *is_error,
        },
        ContentPart::Image { source, media_type } => AnthropicContentBlock::Image {
            source: match source {
                ImageSource::Base64 { data } => AnthropicImageSource::Base64 { data: data.clone() },
                ImageSource::Url { url } => AnthropicImageSource::Url { url: url.clone() },
            },
            media_type: media_type.clone(),
        },
    }
}

fn anthropic_block_to_content_part(block: &AnthropicContentBlock) -> ContentPart {
    match block {
        AnthropicContentBlock::Text { text } => ContentPart::Text { text: text.clone() },
        AnthropicContentBlock::ToolUse { id, name, input } => ContentPart::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        },
        AnthropicContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => ContentPart::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: content.clone(),
            is_error: *is_error,
        },
        AnthropicContentBlock::Image { source, media_type } => ContentPart::Image {
            source: match source {
                AnthropicImageSource::Base64 { data } => ImageSource::Base64 { data: data.clone() },
                AnthropicImageSource::Url { url } => ImageSource::Url { url: url.clone() },
            },
            media_type: media_type.clone(),
        },
    }
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
        let provider = AnthropicProvider::new("test-key");
        let mut request = bare_request();
        request.model = Some("claude-haiku-4-5-20251001".into());
        request.messages = vec![ProviderMessage {
            role: R::User,
            content: vec![ContentPart::Text { text: "Hello".into() }],
        }];
        request.max_tokens = Some(256);
        request.system = Some("Be helpful.".into());

        let api_request = provider.build_request(&request, false);
        assert_eq!(api_request.model, "claude-haiku-4-5-20251001");
        assert_eq!(api_request.max_tokens, 256);
        assert_eq!(api_request.messages.len(), 1);
        assert_eq!(api_request.messages[0].role, "user");
        assert_eq!(api_request.system, Some("Be helpful.".into()));
        assert!(!api_request.stream);
    }

    #[test]
    fn stream_flag_is_set_for_streaming_requests() {
        let provider = AnthropicProvider::new("test-key");
        let api_request = provider.build_request(&bare_request(), true);
        assert!(api_request.stream);
    }

    #[test]
    fn parse_simple_response() {
        let provider = AnthropicProvider::new("test-key");
        let api_response = AnthropicResponse {
            content: vec![AnthropicContentBlock::Text { text: "Hello!".into() }],
            model: "claude-haiku-4-5-20251001".into(),
            stop_reason: "end_turn".into(),
            usage: AnthropicUsage {
                input_tokens: 10,
                output_tokens: 5,
                cache_read_input_tokens: None,
                cache_creation_input_tokens: None,
            },
        };

        let response = provider.parse_response(api_response);
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 5);
        assert!(response.cost.is_some());
        assert_eq!(response.content.len(), 1);
    }

    #[test]
    fn parse_tool_use_response() {
        let provider = AnthropicProvider::new("test-key");
        let api_response = AnthropicResponse {
            content: vec![AnthropicContentBlock::ToolUse {
                id: "tu_1".into(),
                name: "search_chunks".into(),
                input: json!({"query": "bfs"}),
            }],
            model: "claude-haiku-4-5-20251001".into(),
            stop_reason: "tool_use".into(),
            usage: AnthropicUsage {
                input_tokens: 20,
                output_tokens: 30,
                cache_read_input_tokens: None,
                cache_creation_input_tokens: None,
            },
        };

        let response = provider.parse_response(api_response);
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        match &response.content[0] {
            ContentPart::ToolUse { name, .. } => assert_eq!(name, "search_chunks"),
            _ => panic!("expected ToolUse"),
        }
    }

    #[test]
    fn parse_cache_tokens() {
        let provider = AnthropicProvider::new("test-key");
        let api_response = AnthropicResponse {
            content: vec![AnthropicContentBlock::Text { text: "Cached.".into() }],
            model: "claude-haiku-4-5-20251001".into(),
            stop_reason: "end_turn".into(),
            usage: AnthropicUsage {
                input_tokens: 100,
                output_tokens: 10,
                cache_read_input_tokens: Some(50),
                cache_creation_input_tokens: Some(25),
            },
        };

        let response = provider.parse_response(api_response);
        assert_eq!(response.usage.cache_read_tokens, Some(50));
        assert_eq!(response.usage.cache_creation_tokens, Some(25));
    }

    #[test]
    fn default_model_is_haiku() {
        let provider = AnthropicProvider::new("test-key");
        let api_request = provider.build_request(&bare_request(), false);
        assert_eq!(api_request.model, "claude-haiku-4-5-20251001");
    }

    #[test]
    fn default_max_tokens_is_4096() {
        let provider = AnthropicProvider::new("test-key");
        let api_request = provider.build_request(&bare_request(), false);
        assert_eq!(api_request.max_tokens, 4096);
    }

    #[test]
    fn opus_pricing_exceeds_haiku_pricing() {
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 1000,
            cache_read_tokens: None,
            cache_creation_tokens: None,
        };
        let opus = estimate_cost("claude-opus-4-5", &usage);
        let haiku = estimate_cost("claude-haiku-4-5-20251001", &usage);
        assert!(opus > haiku);
    }

    #[test]
    fn tool_schema_serializes() {
        let tool = AnthropicTool {
            name: "search_chunks".into(),
            description: "Semantic search over text chunks".into(),
            input_schema: json!({"type": "object"}),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["name"], "search_chunks");
    }

    #[test]
    fn tool_from_schema_roundtrips_name() {
        let schema = ToolSchema {
            name: "search_chunks".into(),
            description: "desc".into(),
            input_schema: json!({}),
        };
        let mut request = bare_request();
        request.tools = vec![schema];
        let provider = AnthropicProvider::new("test-key");
        let api_request = provider.build_request(&request, false);
        assert_eq!(api_request.tools[0].name, "search_chunks");
    }

    #[test]
    fn with_url_overrides_api_url() {
        let provider = AnthropicProvider::new("test-key").with_url("https://proxy.example.com/v1/messages");
        assert_eq!(provider.api_url, "https://proxy.example.com/v1/messages");
    }

    #[test]
    fn model_name_reports_default() {
        let provider = AnthropicProvider::new("test-key");
        assert_eq!(ChatModel::model_name(&provider), DEFAULT_MODEL);
    }
}
