//! Filesystem-backed context source rooted at a workspace directory.

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use recast_core::error::{Error, Result};
use recast_core::source::{ContextSource, Document};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

pub struct WorkspaceSource {
    root: PathBuf,
    active: RwLock<Option<PathBuf>>,
}

impl WorkspaceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: RwLock::new(None),
        }
    }

    /// Treat `path` as the open document. Relative paths resolve against the root.
    pub fn with_active_document(self, path: impl Into<PathBuf>) -> Self {
        self.set_active_document(Some(path.into()));
        self
    }

    /// Switch the open document; `None` closes it.
    pub fn set_active_document(&self, path: Option<PathBuf>) {
        let resolved = path.map(|p| if p.is_absolute() { p } else { self.root.join(p) });
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = resolved;
    }

    pub fn active_path(&self) -> Option<PathBuf> {
        self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Workspace-relative path with `/` separators, or the path as given
    /// when it lies outside the root.
    fn relative_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    async fn read_document(&self, path: &Path) -> Result<Option<Document>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(Document::new(self.relative_path(path), text))),
            Err(_) => {
                warn!(path = %path.display(), "Skipping file that is not valid UTF-8");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ContextSource for WorkspaceSource {
    async fn active_document(&self) -> Result<Option<Document>> {
        let Some(path) = self.active_path() else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::ContextUnavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }
        self.read_document(&path).await
    }

    async fn find_files(&self, pattern: &str) -> Result<Vec<Document>> {
        let full_pattern = format!(
            "{}/{}",
            Pattern::escape(&self.root.to_string_lossy()),
            pattern.trim_start_matches("./")
        );
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };

        let paths = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
            let entries = glob::glob_with(&full_pattern, options).map_err(|e| {
                Error::InvalidRequest(format!("invalid include pattern '{full_pattern}': {e}"))
            })?;
            let mut paths = Vec::new();
            for entry in entries {
                match entry {
                    Ok(path) if path.is_dir() => {}
                    Ok(path) => paths.push(path),
                    Err(e) => warn!("Glob error for entry: {e}"),
                }
            }
            Ok(paths)
        })
        .await
        .map_err(|e| Error::Io(format!("file search task failed: {e}")))??;

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            if let Some(doc) = self.read_document(path).await? {
                documents.push(doc);
            }
        }

        debug!(pattern, matched = documents.len(), "Resolved include pattern");
        Ok(documents)
    }
}
