pub mod config_cmd;
pub mod generate;
pub mod models;
pub mod session;

use recast_config::AppConfig;
use recast_core::event::{EventBus, TransformEvent};
use recast_core::request::GenerationRequest;
use recast_engine::Orchestrator;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Resolve the workspace root and load its configuration.
pub async fn load_workspace(
    workspace: &Path,
) -> Result<(PathBuf, AppConfig), Box<dyn std::error::Error>> {
    let root = tokio::fs::canonicalize(workspace)
        .await
        .map_err(|e| format!("Workspace {} is not accessible: {e}", workspace.display()))?;
    let config = AppConfig::load(&root).map_err(|e| format!("Failed to load config: {e}"))?;
    tracing::debug!(
        workspace = %root.display(),
        config = %AppConfig::config_path(&root).display(),
        "Workspace loaded"
    );
    Ok((root, config))
}

/// Print engine warnings to stderr until the bus closes.
pub fn spawn_event_reporter(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    TransformEvent::IncompleteGeneration {
                        reason, message, ..
                    } => {
                        eprintln!("  ⚠️  Response incomplete ({reason}); showing partial output");
                        if let Some(message) = message {
                            eprintln!("     {message}");
                        }
                    }
                    TransformEvent::CacheCreated {
                        cache_id,
                        expires_at,
                        ..
                    } => {
                        eprintln!("  Context cached as {cache_id} until {expires_at}");
                    }
                    TransformEvent::CacheReused { cache_id, .. } => {
                        eprintln!("  Reusing context cache {cache_id}");
                    }
                    TransformEvent::TokensUsed { total_tokens, .. } => {
                        eprintln!("  Tokens used: {total_tokens}");
                    }
                    TransformEvent::Cancelled { .. } => {}
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Run one request; Ctrl+C cancels it.
pub async fn generate_interruptible(
    orchestrator: &Orchestrator,
    request: &GenerationRequest,
) -> recast_core::Result<String> {
    let generation = orchestrator.generate(request);
    tokio::pin!(generation);
    tokio::select! {
        result = &mut generation => result,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.cancel();
            generation.await
        }
    }
}
