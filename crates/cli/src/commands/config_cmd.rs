//! `recast config`: Configuration inspection commands.

use recast_config::AppConfig;
use std::path::Path;

pub async fn show(workspace: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (root, mut config) = super::load_workspace(workspace).await?;

    if config.access_token.is_some() {
        config.access_token = Some("[REDACTED]".into());
    }

    println!("# {}", AppConfig::config_path(&root).display());
    if config.require_project().is_err() {
        println!("# ⚠️  project_id is not set (set RECAST_PROJECT_ID or GOOGLE_CLOUD_PROJECT)");
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub async fn show_default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

pub async fn path(workspace: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let root = tokio::fs::canonicalize(workspace).await?;
    println!("{}", AppConfig::config_path(&root).display());
    Ok(())
}
