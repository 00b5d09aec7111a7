//! `recast generate`: one prompt, one markdown file.

use clap::Args;
use recast_core::request::GenerationRequest;
use recast_core::source::SourceScope;
use recast_engine::{Orchestrator, WorkspaceSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::output;

#[derive(Args)]
pub struct GenerateArgs {
    /// What the model should do with the code
    #[arg(short, long)]
    pub prompt: String,

    /// `file` for the open document, `repository` for every matching file
    #[arg(short, long, default_value = "repository")]
    pub scope: SourceScope,

    /// The open document (required for `--scope file`)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Model id (defaults to `default_model`)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Upload the repository context as a server-side cache
    #[arg(long)]
    pub cache: bool,

    /// Print the response instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

pub async fn run(workspace: &Path, args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (root, config) = super::load_workspace(workspace).await?;

    let source = WorkspaceSource::new(&root);
    if let Some(file) = &args.file {
        source.set_active_document(Some(file.clone()));
    }

    let orchestrator = Orchestrator::from_config(Arc::new(source), &config)?;
    let reporter = super::spawn_event_reporter(orchestrator.events());

    let model = args.model.unwrap_or_else(|| config.default_model.clone());
    let request = GenerationRequest::new(args.scope, args.prompt, model).with_cache(args.cache);

    eprint!("  Generating...");
    let result = super::generate_interruptible(&orchestrator, &request).await;
    eprint!("\r              \r");
    // Closing the bus lets the reporter drain pending warnings and exit.
    drop(orchestrator);
    let _ = reporter.await;

    let text = result?;
    if args.stdout {
        println!("{text}");
    } else {
        let path =
            output::write_response(&root, &config.output.directory, &text, chrono::Utc::now())
                .await?;
        println!("{}", path.display());
    }

    Ok(())
}
