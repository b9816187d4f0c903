//! `StateStore` — session/turn-state and profile-memory persistence.
//!
//! Generalized from the teacher's `StateStore` trait: same
//! `read`/`write`/`delete`/`search` shape, scoped by [`StateScope`] instead
//! of the teacher's effect-scope enum, so a session's `TurnState` and a
//! user's profile memory can share one collaborator trait while staying
//! isolated from each other.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::id::{SessionId, UserId};

/// The isolation boundary for a `StateStore` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateScope {
    /// State private to one conversation session (e.g. `TurnState` snapshots).
    Session(SessionId),
    /// State shared across a user's sessions (profile memory).
    User(UserId),
}

/// One hit from a `StateStore::search` call.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The matched key.
    pub key: String,
    /// The stored value.
    pub value: serde_json::Value,
    /// Relevance score, if the backend can produce one.
    pub score: f32,
}

/// Read-only view of a [`StateStore`], for collaborators that should not be
/// able to mutate session state (e.g. a read-only profile lookup tool).
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Read the value stored at `key` within `scope`, if any.
    async fn read(&self, scope: &StateScope, key: &str) -> Result<Option<serde_json::Value>, StateError>;

    /// List all keys within `scope` starting with `prefix`.
    async fn list(&self, scope: &StateScope, prefix: &str) -> Result<Vec<String>, StateError>;

    /// Best-effort relevance search within `scope`. Backends without
    /// semantic search return an empty vector rather than an error.
    async fn search(&self, scope: &StateScope, query: &str, limit: usize) -> Result<Vec<SearchResult>, StateError>;
}

/// Scoped key/value persistence for session state and profile memory.
#[async_trait]
pub trait StateStore: StateReader {
    /// Write `value` at `key` within `scope`, overwriting any prior value.
    async fn write(&self, scope: &StateScope, key: &str, value: serde_json::Value) -> Result<(), StateError>;

    /// Remove `key` within `scope`. No-op if absent.
    async fn delete(&self, scope: &StateScope, key: &str) -> Result<(), StateError>;
}
