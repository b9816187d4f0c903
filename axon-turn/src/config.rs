//! Per-model-role defaults merged into a [`ProviderRequest`] at call time.
//!
//! The teacher's `NeuronTurnConfig` held one fixed set of defaults
//! (`system_prompt`/`default_model`/`default_max_tokens`) merged with
//! per-request overrides; this core needs the same merge pattern but per
//! *role* (reasoning, fast, embedding), since the Planner/Judge/Responder
//! may run on a different model than the per-step sub-agent calls.

use std::time::Duration;

use crate::types::ProviderRequest;

/// Static defaults for one model role, merged with a per-call
/// [`ProviderRequest`] that only fills in what differs.
#[derive(Debug, Clone)]
pub struct ModelDefaults {
    /// Model identifier to use when the request doesn't override it.
    pub model: String,
    /// Default max output tokens.
    pub max_tokens: u32,
    /// Default sampling temperature.
    pub temperature: Option<f64>,
    /// Default per-call timeout (spec §5 default 600s).
    pub timeout: Duration,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: None,
            timeout: Duration::from_secs(600),
        }
    }
}

impl ModelDefaults {
    /// Build a request for `messages`, filling in this role's defaults for
    /// any field the caller didn't already set on `partial`.
    pub fn build_request(&self, mut partial: ProviderRequest) -> ProviderRequest {
        if partial.model.is_none() && !self.model.is_empty() {
            partial.model = Some(self.model.clone());
        }
        if partial.max_tokens.is_none() {
            partial.max_tokens = Some(self.max_tokens);
        }
        if partial.temperature.is_none() {
            partial.temperature = self.temperature;
        }
        if partial.timeout.is_none() {
            partial.timeout = Some(self.timeout);
        }
        partial
    }
}
