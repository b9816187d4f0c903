//! Typed ID wrappers used across the orchestration core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up session IDs, sub-task IDs, etc.
/// These are just strings underneath — no UUID enforcement, no format
/// requirement. The core doesn't care what your IDs look like.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(SessionId, "Unique identifier for a conversation session.");
typed_id!(UserId, "Unique identifier for a caller-supplied user.");
typed_id!(SubTaskId, "Unique identifier for a plan sub-task.");
typed_id!(ToolCallId, "Unique identifier for a single tool invocation.");
typed_id!(ChunkId, "Stable identifier for a text chunk.");
typed_id!(EntityId, "Stable identifier for a deduplicated entity.");
