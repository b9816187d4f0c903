//! Context compaction strategies.
//!
//! Generalized from the teacher's `neuron-context` strategy set
//! (`SlidingWindow`, `Summarization`, `ToolResultClearing`, `Composite`) onto
//! [`axon_core::Message`] instead of the teacher's provider-native content
//! blocks. Each strategy trims a sub-agent's own ReAct conversation so a
//! long-running sub-task doesn't grow its prompt without bound across steps.

use axon_core::Message;

use crate::counter::TokenCounter;

/// A strategy for keeping a message sequence within a token budget.
pub trait ContextStrategy: Send + Sync {
    /// Compact `messages` toward `budget` tokens. May return the input
    /// unchanged if already within budget.
    fn compact(&self, messages: Vec<Message>, budget: usize, counter: &TokenCounter) -> Vec<Message>;
}

/// Never compacts. Useful for short conversations or testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompaction;

impl ContextStrategy for NoCompaction {
    fn compact(&self, messages: Vec<Message>, _budget: usize, _counter: &TokenCounter) -> Vec<Message> {
        messages
    }
}

/// Drops the oldest messages once over budget, always keeping the first
/// message (typically the turn's opening user question) and the most recent
/// messages that fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlidingWindowStrategy;

impl ContextStrategy for SlidingWindowStrategy {
    fn compact(&self, messages: Vec<Message>, budget: usize, counter: &TokenCounter) -> Vec<Message> {
        if messages.len() <= 2 || counter.estimate(&messages) <= budget {
            return messages;
        }

        let first = messages[0].clone();
        let rest = &messages[1..];

        let mut kept = Vec::new();
        let mut current = counter.estimate_message(&first);
        for msg in rest.iter().rev() {
            let msg_tokens = counter.estimate_message(msg);
            if current + msg_tokens > budget && !kept.is_empty() {
                break;
            }
            kept.push(msg.clone());
            current += msg_tokens;
        }
        kept.reverse();

        let mut result = vec![first];
        result.extend(kept);
        result
    }
}

/// Replaces all but the most recent `keep_last_n` `ToolResult` messages with
/// a short placeholder, on the theory that old tool observations are the
/// cheapest thing to forget once the model has already reasoned past them.
#[derive(Debug, Clone, Copy)]
pub struct ToolResultClearingStrategy {
    /// Number of most-recent tool results to leave untouched.
    pub keep_last_n: usize,
}

impl ToolResultClearingStrategy {
    /// Construct clearing all but the last `keep_last_n` tool results.
    pub fn new(keep_last_n: usize) -> Self {
        Self { keep_last_n }
    }
}

impl ContextStrategy for ToolResultClearingStrategy {
    fn compact(&self, messages: Vec<Message>, budget: usize, counter: &TokenCounter) -> Vec<Message> {
        if counter.estimate(&messages) <= budget {
            return messages;
        }

        let tool_result_indices: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter_map(|(i, m)| matches!(m, Message::ToolResult { .. }).then_some(i))
            .collect();
        let clear_count = tool_result_indices.len().saturating_sub(self.keep_last_n);
        let to_clear: std::collections::HashSet<usize> =
            tool_result_indices.into_iter().take(clear_count).collect();

        messages
            .into_iter()
            .enumerate()
            .map(|(i, m)| match m {
                Message::ToolResult {
                    tool_call_id,
                    is_error,
                    ..
                } if to_clear.contains(&i) => Message::ToolResult {
                    tool_call_id,
                    content: "[tool result cleared to save context]".into(),
                    is_error,
                },
                other => other,
            })
            .collect()
    }
}

/// Keeps the first `pinned_prefix` messages untouched (e.g. the system
/// prompt and opening question) and delegates compaction of the remainder
/// to an inner strategy.
pub struct PersistentStrategy {
    /// Number of leading messages that are never dropped or altered.
    pub pinned_prefix: usize,
    inner: Box<dyn ContextStrategy>,
}

impl PersistentStrategy {
    /// Wrap `inner`, pinning the first `pinned_prefix` messages.
    pub fn new(pinned_prefix: usize, inner: Box<dyn ContextStrategy>) -> Self {
        Self {
            pinned_prefix,
            inner,
        }
    }
}

impl ContextStrategy for PersistentStrategy {
    fn compact(&self, messages: Vec<Message>, budget: usize, counter: &TokenCounter) -> Vec<Message> {
        let split = self.pinned_prefix.min(messages.len());
        let (pinned, rest) = messages.split_at(split);
        let pinned_tokens = counter.estimate(pinned);
        let remaining_budget = budget.saturating_sub(pinned_tokens);
        let mut result = pinned.to_vec();
        result.extend(self.inner.compact(rest.to_vec(), remaining_budget, counter));
        result
    }
}

/// When over budget, replaces every message beyond the most recent
/// `keep_recent` with a single synthetic system message noting how many
/// messages were elided. A stand-in for true model-driven summarization
/// (which would require a `ChatModel` call) — deterministic and
/// dependency-free, matching the teacher's "never make compaction itself a
/// suspension point" posture.
#[derive(Debug, Clone, Copy)]
pub struct SummarizationStrategy {
    /// Number of most-recent messages kept verbatim.
    pub keep_recent: usize,
}

impl SummarizationStrategy {
    /// Construct, keeping the most recent `keep_recent` messages verbatim.
    pub fn new(keep_recent: usize) -> Self {
        Self { keep_recent }
    }
}

impl ContextStrategy for SummarizationStrategy {
    fn compact(&self, messages: Vec<Message>, budget: usize, counter: &TokenCounter) -> Vec<Message> {
        if counter.estimate(&messages) <= budget || messages.len() <= self.keep_recent {
            return messages;
        }
        let split = messages.len() - self.keep_recent;
        let elided = split;
        let mut result = vec![Message::System {
            content: format!("[{elided} earlier messages elided to fit context budget]"),
        }];
        result.extend(messages.into_iter().skip(split));
        result
    }
}

/// Chains strategies in order, feeding each one's output to the next.
pub struct CompositeStrategy {
    stages: Vec<Box<dyn ContextStrategy>>,
}

impl CompositeStrategy {
    /// Construct from an ordered list of stages.
    pub fn new(stages: Vec<Box<dyn ContextStrategy>>) -> Self {
        Self { stages }
    }
}

impl ContextStrategy for CompositeStrategy {
    fn compact(&self, messages: Vec<Message>, budget: usize, counter: &TokenCounter) -> Vec<Message> {
        let mut current = messages;
        for stage in &self.stages {
            current = stage.compact(current, budget, counter);
        }
        current
    }
}
