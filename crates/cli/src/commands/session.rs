//! `recast session`: interactive prompt loop.
//!
//! One orchestrator lives for the whole session, so a repository context
//! cache created by the first cached prompt is reused by the next ones.

use clap::Args;
use recast_core::request::GenerationRequest;
use recast_core::source::SourceScope;
use recast_engine::{Orchestrator, WorkspaceSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::output;

#[derive(Args)]
pub struct SessionArgs {
    /// Starting scope
    #[arg(short, long, default_value = "repository")]
    pub scope: SourceScope,

    /// Starting open document
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Starting model id (defaults to `default_model`)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Start with the context cache enabled
    #[arg(long)]
    pub cache: bool,
}

/// Settings applied to every prompt of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub scope: SourceScope,
    pub model: String,
    pub use_cache: bool,
}

/// One line of input, classified.
#[derive(Debug, PartialEq)]
pub enum Input {
    Prompt(String),
    Scope(SourceScope),
    Model(String),
    Cache(bool),
    File(Option<PathBuf>),
    Clear,
    Exit,
    Empty,
}

/// Classify one input line. Lines starting with `/` are commands.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
        return Ok(Input::Exit);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Prompt(line.to_string()));
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((command, ""));

    match name {
        "scope" => arg.parse().map(Input::Scope),
        "model" if !arg.is_empty() => Ok(Input::Model(arg.to_string())),
        "model" => Err("usage: /model <id>".into()),
        "cache" => match arg {
            "on" | "true" | "1" => Ok(Input::Cache(true)),
            "off" | "false" | "0" => Ok(Input::Cache(false)),
            _ => Err("usage: /cache on|off".into()),
        },
        "file" if arg.is_empty() => Ok(Input::File(None)),
        "file" => Ok(Input::File(Some(PathBuf::from(arg)))),
        "clear" => Ok(Input::Clear),
        other => Err(format!("unknown command /{other}")),
    }
}

pub async fn run(workspace: &Path, args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (root, config) = super::load_workspace(workspace).await?;

    let source = Arc::new(WorkspaceSource::new(&root));
    source.set_active_document(args.file.clone());
    let orchestrator = Orchestrator::from_config(source.clone(), &config)?;
    let reporter = super::spawn_event_reporter(orchestrator.events());

    let mut state = SessionState {
        scope: args.scope,
        model: args.model.unwrap_or_else(|| config.default_model.clone()),
        use_cache: args.cache,
    };

    println!();
    println!("  Recast session in {}", root.display());
    println!("  Scope: {}  Model: {}  Cache: {}", state.scope, state.model, state.use_cache);
    println!("  Commands: /scope file|repository, /model <id>, /cache on|off, /file [path], /clear");
    println!("  Type 'exit' to quit; Ctrl+C cancels a running prompt.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF (Ctrl+D)
        };

        match parse_input(&line) {
            Ok(Input::Empty) => continue,
            Ok(Input::Exit) => break,
            Ok(Input::Scope(scope)) => {
                state.scope = scope;
                println!("  Scope: {scope}");
            }
            Ok(Input::Model(model)) => {
                println!("  Model: {model}");
                state.model = model;
            }
            Ok(Input::Cache(on)) => {
                state.use_cache = on;
                println!("  Cache: {on}");
            }
            Ok(Input::File(path)) => {
                match &path {
                    Some(p) => println!("  Open document: {}", p.display()),
                    None => println!("  Open document closed"),
                }
                source.set_active_document(path);
            }
            Ok(Input::Clear) => {
                orchestrator.reset_cache().await;
                println!("  Context cache cleared");
            }
            Ok(Input::Prompt(prompt)) => {
                let request = GenerationRequest::new(state.scope, prompt, state.model.clone())
                    .with_cache(state.use_cache);
                match super::generate_interruptible(&orchestrator, &request).await {
                    Ok(text) => {
                        let path = output::write_response(
                            &root,
                            &config.output.directory,
                            &text,
                            chrono::Utc::now(),
                        )
                        .await?;
                        println!();
                        for line in text.lines() {
                            println!("  Assistant > {line}");
                        }
                        println!();
                        println!("  Saved to {}", path.display());
                    }
                    Err(e) if e.is_cancelled() => println!("  Cancelled"),
                    Err(e) => eprintln!("  [Error] {e}"),
                }
                println!();
            }
            Err(usage) => eprintln!("  {usage}"),
        }
    }

    drop(orchestrator);
    let _ = reporter.await;
    println!();
    println!("  Goodbye!");
    Ok(())
}
