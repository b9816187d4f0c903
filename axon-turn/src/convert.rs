//! Conversion between the orchestrator's `axon_core::Message` log and the
//! provider wire vocabulary (`ProviderMessage`/`ContentPart`).
//!
//! This is the "context assembly" step: every model call (Planner, Judge,
//! Responder, sub-agent step) builds its `ProviderRequest.messages` by
//! mapping the turn's message log through [`messages_to_provider`].

use axon_core::Message;

use crate::types::{ContentPart, ProviderMessage, ProviderResponse, Role};

/// Convert one orchestrator message to a provider wire message.
///
/// `ToolResult` messages are mapped to a `User`-role message carrying a
/// `ContentPart::ToolResult` part, matching how most chat APIs expect tool
/// output to be fed back (as a user-role turn referencing the tool call id).
pub fn message_to_provider(message: &Message) -> ProviderMessage {
    match message {
        Message::System { content } => ProviderMessage {
            role: Role::System,
            content: vec![ContentPart::Text {
                text: content.clone(),
            }],
        },
        Message::User { content } => ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text {
                text: content.clone(),
            }],
        },
        Message::Assistant {
            content,
            tool_calls,
            ..
        } => {
            let mut parts = Vec::new();
            if !content.is_empty() {
                parts.push(ContentPart::Text {
                    text: content.clone(),
                });
            }
            for call in tool_calls {
                parts.push(ContentPart::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: serde_json::json!({ "input": call.args }),
                });
            }
            ProviderMessage {
                role: Role::Assistant,
                content: parts,
            }
        }
        Message::ToolResult {
            tool_call_id,
            content,
            is_error,
        } => ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::ToolResult {
                tool_use_id: tool_call_id.clone(),
                content: content.clone(),
                is_error: *is_error,
            }],
        },
    }
}

/// Convert an entire message log to provider wire messages, in order.
pub fn messages_to_provider(messages: &[Message]) -> Vec<ProviderMessage> {
    messages.iter().map(message_to_provider).collect()
}

/// Convert a provider response into an assistant message, carrying the
/// response's reasoning channel (if any) and no tool calls — callers that
/// need tool calls on the message construct them separately, since this
/// core's sub-agent dispatches tools via the textual Action protocol rather
/// than provider-native tool-calling.
pub fn response_to_message(response: &ProviderResponse) -> Message {
    Message::Assistant {
        content: response.text(),
        tool_calls: Vec::new(),
        reasoning_content: response.reasoning.clone(),
    }
}
