//! Install and update commands.

use anyhow::Result;
use std::path::PathBuf;

use uwsgi_recipe::config::Config;

use super::load_recipe;

/// Execute the install command.
pub fn cmd_install(config: &Config, json: bool) -> Result<()> {
    let recipe = load_recipe(config)?;
    let artifacts = recipe.install()?;
    print_artifacts(&artifacts, json)
}

/// Execute the update command.
pub fn cmd_update(config: &Config, json: bool) -> Result<()> {
    let recipe = load_recipe(config)?;
    let artifacts = recipe.update()?;
    print_artifacts(&artifacts, json)
}

fn print_artifacts(artifacts: &[PathBuf], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(artifacts)?);
    } else {
        for path in artifacts {
            println!("{}", path.display());
        }
    }
    Ok(())
}
