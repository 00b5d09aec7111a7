//! Context sources: where the code sent to the model comes from.
//!
//! The editor/workspace integration implements [`ContextSource`]; the engine
//! only ever sees [`Document`] values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which context-gathering strategy a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    /// The single document currently open in the editor.
    ActiveDocument,
    /// Every workspace file matching the configured include patterns.
    Repository,
}

impl fmt::Display for SourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveDocument => f.write_str("active_document"),
            Self::Repository => f.write_str("repository"),
        }
    }
}

impl FromStr for SourceScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "tab" | "opentab" | "active" | "active_document" => Ok(Self::ActiveDocument),
            "repo" | "repository" => Ok(Self::Repository),
            other => Err(format!(
                "unknown scope '{other}' (expected 'file' or 'repository')"
            )),
        }
    }
}

/// A source file as read from the workspace. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Workspace-relative path with `/` separators.
    pub path: String,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Supplies documents from the editor or workspace.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// The document currently open, if any.
    async fn active_document(&self) -> crate::Result<Option<Document>>;

    /// Every document matching one glob pattern, in match order.
    async fn find_files(&self, pattern: &str) -> crate::Result<Vec<Document>>;
}
