//! Rough token counting for [`axon_core::Message`] sequences.
//!
//! This is the same chars-per-token heuristic the teacher's `SlidingWindow`
//! used, extracted to a standalone type so every strategy shares one
//! estimation rule instead of re-deriving it.

use axon_core::Message;

/// Estimates token counts with a fixed chars-per-token ratio.
///
/// Not a tokenizer — a cheap, deterministic stand-in good enough to decide
/// "are we over budget", which is all compaction strategies need.
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    chars_per_token: usize,
}

impl TokenCounter {
    /// Construct with the default ratio (4 chars/token).
    pub fn new() -> Self {
        Self { chars_per_token: 4 }
    }

    /// Construct with a custom ratio; floored at 1 to avoid division by zero.
    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Estimated token count of a single message, including a small
    /// per-message overhead for role/formatting.
    pub fn estimate_message(&self, message: &Message) -> usize {
        message.content().len() / self.chars_per_token + 4
    }

    /// Estimated token count of a full message sequence.
    pub fn estimate(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}
