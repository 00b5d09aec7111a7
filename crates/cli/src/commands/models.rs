//! `recast models`: list the configured models.

use std::path::Path;

pub async fn run(workspace: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_, config) = super::load_workspace(workspace).await?;

    println!("🤖 Models ({})", config.location_id);
    for model in &config.models {
        let marker = if *model == config.default_model { "*" } else { " " };
        println!("   {marker} {model}");
    }
    if !config.models.contains(&config.default_model) {
        println!("   * {} (default, not listed)", config.default_model);
    }
    Ok(())
}
