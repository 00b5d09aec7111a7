//! Error types for the Recast domain.
//!
//! Uses `thiserror` for ergonomic error definitions. [`Error`] is the one
//! type callers of the engine see; [`ProviderError`] describes transport
//! failures and is wrapped by the variants that can carry one.

use crate::model::FinishReason;
use thiserror::Error;

/// The top-level error type for all Recast operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No open document, no include patterns, or no files matched them.
    #[error("No code context available: {0}")]
    ContextUnavailable(String),

    /// The user prompt was empty or whitespace-only.
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    /// The request failed validation for a reason other than the prompt.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend refused or failed to create a context cache.
    #[error("Context cache creation failed: {0}")]
    CacheCreation(#[source] ProviderError),

    /// Transport succeeded but the backend returned no response envelope.
    #[error("Backend returned no response")]
    NoResponse,

    /// The response envelope contained zero candidates.
    #[error("Backend response contained no candidates")]
    EmptyCandidate,

    /// Generation stopped for a reason other than a natural stop.
    #[error("Generation finished with reason {reason}{}", message_suffix(.partial_message))]
    IncompleteGeneration {
        reason: FinishReason,
        partial_message: Option<String>,
        partial_text: String,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,

    /// Transport failure during a generate call.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Reading the workspace failed.
    #[error("Workspace I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is the user-initiated cancellation.
    ///
    /// Cancellation is not a failure for metrics purposes.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Partial output carried by an incomplete generation, if any.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::IncompleteGeneration { partial_text, .. } if !partial_text.is_empty() => {
                Some(partial_text)
            }
            _ => None,
        }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {m}"),
        _ => String::new(),
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the model provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Transport '{transport}' cannot send a {shape} request")]
    UnsupportedShape {
        transport: String,
        shape: &'static str,
    },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}
