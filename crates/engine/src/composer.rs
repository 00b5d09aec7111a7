//! Prompt composer: merges context, system prompt, and user prompt into a
//! [`ModelRequest`].

use recast_core::error::{Error, Result};
use recast_core::model::ModelRequest;

use crate::context::ContextBlock;

/// Builds the request payload for one generate call.
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    instructions: String,
}

impl PromptComposer {
    /// `instructions` are prepended to every user turn; empty means none.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    /// The final user part, shared by both request shapes.
    pub fn user_turn(&self, user_prompt: &str) -> String {
        if self.instructions.trim().is_empty() {
            user_prompt.to_string()
        } else {
            format!("{}\nUser request: {user_prompt}", self.instructions)
        }
    }

    /// A cache reference wins over the context block: a cached request
    /// never carries the system prompt or the context.
    pub fn compose(
        &self,
        context: Option<&ContextBlock>,
        system_prompt: &str,
        user_prompt: &str,
        cache_ref: Option<&str>,
    ) -> Result<ModelRequest> {
        if user_prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let turn = self.user_turn(user_prompt);
        Ok(match cache_ref {
            Some(cache_ref) => ModelRequest::Cached {
                cached_content: cache_ref.to_string(),
                user_parts: vec![turn],
            },
            None => ModelRequest::Fresh {
                system_instruction: system_prompt.to_string(),
                user_parts: vec![
                    context.map(|c| c.text.clone()).unwrap_or_default(),
                    turn,
                ],
            },
        })
    }
}
