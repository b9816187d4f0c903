//! The turn message log: a heterogeneous sequence of system/user/assistant/
//! tool-result entries that accumulates across one orchestrator turn.

use serde::{Deserialize, Serialize};

/// One entry in a turn's message log.
///
/// Tagged by `role`; assistant entries additionally carry optional
/// `tool_calls` and `reasoning_content`. Internal bookkeeping messages
/// (plans, aggregated results, quality reviews) are plain `Assistant`
/// entries whose `content` is prefixed with an internal marker — see
/// [`Message::is_internal`].
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// A system prompt entry.
    System {
        /// The prompt text.
        content: String,
    },
    /// A user-authored entry.
    User {
        /// The user's text.
        content: String,
    },
    /// A model-authored entry.
    Assistant {
        /// The visible text content, if any.
        content: String,
        /// Tool calls the model requested, if any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRef>,
        /// Hidden chain-of-thought text, if the backing model exposed one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },
    /// The result of executing one tool call, fed back to the model.
    ToolResult {
        /// The `ToolCallRef.id` this result answers.
        tool_call_id: String,
        /// The tool's (possibly truncated) output text.
        content: String,
        /// Whether the tool raised an error.
        is_error: bool,
    },
}

/// A reference to a tool call attached to an `Assistant` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRef {
    /// Unique id for this call, shared with the matching `ToolResult`.
    pub id: String,
    /// Name of the invoked tool.
    pub name: String,
    /// The literal argument string passed to the tool.
    pub args: String,
}

/// Internal message prefixes used by the Orchestrator for bookkeeping
/// assistant entries that must never surface in dialogue-history rendering
/// (spec: Planner history rendering excludes these from the last-5-rounds
/// view fed back to the model).
pub const INTERNAL_PREFIXES: [&str; 3] = ["[Plan]", "[Aggregated Results]", "[Quality Review]"];

impl Message {
    /// Construct a plain system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Construct a plain user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Construct a plain assistant message with no tool calls or reasoning.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
            reasoning_content: None,
        }
    }

    /// Construct a tool-result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Message::ToolResult {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error,
        }
    }

    /// Whether this message is an internal bookkeeping entry that must be
    /// excluded from the dialogue history shown back to the Planner.
    ///
    /// True for any `Assistant` message whose content starts with one of
    /// [`INTERNAL_PREFIXES`], or that carries tool-call metadata, and for
    /// every `ToolResult` message.
    pub fn is_internal(&self) -> bool {
        match self {
            Message::Assistant {
                content,
                tool_calls,
                ..
            } => {
                !tool_calls.is_empty() || INTERNAL_PREFIXES.iter().any(|p| content.starts_with(p))
            }
            Message::ToolResult { .. } => true,
            Message::System { .. } | Message::User { .. } => false,
        }
    }

    /// The plain text content of this message, ignoring tool metadata.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content } => content,
            Message::User { content } => content,
            Message::Assistant { content, .. } => content,
            Message::ToolResult { content, .. } => content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_prefixes_are_detected() {
        let m = Message::assistant("[Plan] 1. find BFS prereqs");
        assert!(m.is_internal());
    }

    #[test]
    fn plain_user_and_assistant_are_not_internal() {
        assert!(!Message::user("what is BFS?").is_internal());
        assert!(!Message::assistant("BFS is a graph traversal algorithm.").is_internal());
    }

    #[test]
    fn tool_result_is_always_internal() {
        assert!(Message::tool_result("call-1", "42", false).is_internal());
    }

    #[test]
    fn assistant_with_tool_calls_is_internal() {
        let m = Message::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCallRef {
                id: "call-1".into(),
                name: "search".into(),
                args: "BFS".into(),
            }],
            reasoning_content: None,
        };
        assert!(m.is_internal());
    }

    #[test]
    fn role_tag_round_trips() {
        let m = Message::user("hello");
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["role"], "user");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
