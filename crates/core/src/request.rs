//! The caller-supplied generation request.

use crate::error::{Error, Result};
use crate::source::SourceScope;
use serde::{Deserialize, Serialize};

/// One user instruction plus the settings chosen in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub scope: SourceScope,
    pub prompt: String,
    pub model_id: String,
    /// Opt in to the server-side context cache (repository scope only).
    #[serde(default)]
    pub use_cache: bool,
}

impl GenerationRequest {
    pub fn new(scope: SourceScope, prompt: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            scope,
            prompt: prompt.into(),
            model_id: model_id.into(),
            use_cache: false,
        }
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Reject empty prompts and model ids before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }
        if self.model_id.trim().is_empty() {
            return Err(Error::InvalidRequest("model id must not be empty".into()));
        }
        Ok(())
    }

    /// Whether this request is eligible for the context cache at all.
    pub fn wants_cache(&self) -> bool {
        self.use_cache && self.scope == SourceScope::Repository
    }
}
