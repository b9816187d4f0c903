//! Error types shared by the orchestration core.

use thiserror::Error;

/// Turn-level execution errors (one user turn through the orchestrator).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OrchError {
    /// A model call (planner, judge, responder, sub-agent) failed.
    #[error("model error: {0}")]
    Model(String),

    /// A sub-task's reasoning loop raised an exception. Per spec §7 this is
    /// caught and converted into an `ERROR: sub-task failed` intermediate
    /// result rather than aborting the turn — this variant carries the
    /// underlying cause for logging.
    #[error("sub-task {sub_task} failed: {message}")]
    SubTaskFailed {
        /// Id of the sub-task that failed.
        sub_task: String,
        /// Underlying failure message (never shown to the caller).
        message: String,
    },

    /// Session/turn-state persistence failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Uncaught error with no more specific classification. Per spec §7
    /// this terminates the turn with a generic error on the transport.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from `VectorStore`/`GraphStore`/session-store backends.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key/id not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A transient failure (connection reset, timeout). Retryable per
    /// spec §5/§7 (exponential backoff, max 3 attempts).
    #[error("transient store error: {0}")]
    Transient(String),

    /// A non-retryable failure (bad query, constraint violation).
    #[error("store error: {0}")]
    NonRetryable(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Whether retrying this operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// State/session-store errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// Key not found in the given scope.
    #[error("not found: {scope}/{key}")]
    NotFound {
        /// The scope that was searched (e.g. a session id).
        scope: String,
        /// The key that was not found.
        key: String,
    },

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Hook errors. These are logged but do NOT halt the caller — hooks can
/// only halt by returning `HookAction::Halt`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook execution failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
