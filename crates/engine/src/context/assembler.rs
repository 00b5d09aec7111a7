//! Context assembler: turns documents into one tagged text block.

use recast_core::error::{Error, Result};
use recast_core::source::{ContextSource, Document, SourceScope};
use tracing::debug;

/// The formatted code context for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub scope: SourceScope,
    /// Paths in the order they were rendered; may contain duplicates.
    pub paths: Vec<String>,
    pub text: String,
}

impl ContextBlock {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.paths.len()
    }
}

/// Gathers documents for a scope and renders the `<context>` envelope.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    include_patterns: Vec<String>,
}

impl ContextAssembler {
    pub fn new(include_patterns: Vec<String>) -> Self {
        Self { include_patterns }
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    pub async fn build(&self, scope: SourceScope, source: &dyn ContextSource) -> Result<ContextBlock> {
        match scope {
            SourceScope::ActiveDocument => {
                let doc = source.active_document().await?.ok_or_else(|| {
                    Error::ContextUnavailable("no document is open".into())
                })?;
                debug!(path = %doc.path, bytes = doc.text.len(), "Assembled active document context");
                Ok(ContextBlock {
                    scope,
                    text: format!("<context>\n{}\n</context>", format_document(&doc)),
                    paths: vec![doc.path],
                })
            }
            SourceScope::Repository => {
                if self.include_patterns.is_empty() {
                    return Err(Error::ContextUnavailable(
                        "no include patterns are configured".into(),
                    ));
                }

                let mut paths = Vec::new();
                let mut code = String::new();
                for pattern in &self.include_patterns {
                    for doc in source.find_files(pattern).await? {
                        code.push_str(&format_document(&doc));
                        paths.push(doc.path);
                    }
                }

                if paths.is_empty() {
                    return Err(Error::ContextUnavailable(format!(
                        "no files match {}",
                        self.include_patterns.join(", ")
                    )));
                }

                debug!(
                    files = paths.len(),
                    bytes = code.len(),
                    "Assembled repository context"
                );
                Ok(ContextBlock {
                    scope,
                    paths,
                    text: format!("<context>\n<files>\n{code}\n</files>\n</context>"),
                })
            }
        }
    }
}

/// Render one document. The text is passed through unescaped.
pub fn format_document(doc: &Document) -> String {
    format!("<code filename='../{}'>{}</code>", doc.path, doc.text)
}
