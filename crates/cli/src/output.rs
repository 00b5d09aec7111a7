//! Markdown output sink.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// `20240514T101112345Z.md`: the ISO-8601 instant without `-`, `:` or `.`.
pub fn file_name(now: DateTime<Utc>) -> String {
    format!("{}.md", now.format("%Y%m%dT%H%M%S%3fZ"))
}

/// Write `text` under `{workspace}/{directory}` and return the file path.
pub async fn write_response(
    workspace: &Path,
    directory: &str,
    text: &str,
    now: DateTime<Utc>,
) -> std::io::Result<PathBuf> {
    let dir = workspace.join(directory);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(file_name(now));
    tokio::fs::write(&path, text).await?;
    Ok(path)
}
