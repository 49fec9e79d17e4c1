//! Read-only commands: render, paths, show.

use anyhow::Result;
use serde::Serialize;

use uwsgi_recipe::buildout::BuildoutSettings;
use uwsgi_recipe::config::Config;
use uwsgi_recipe::options::Options;

use super::load_recipe;

/// Execute the render command: print the document without writing it.
pub fn cmd_render(config: &Config) -> Result<()> {
    let recipe = load_recipe(config)?;
    println!("{}", recipe.render_config());
    Ok(())
}

/// Execute the paths command.
pub fn cmd_paths(config: &Config, json: bool) -> Result<()> {
    let recipe = load_recipe(config)?;
    let paths = recipe.resolve_paths();
    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        for path in paths {
            println!("{}", path);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Effective<'a> {
    config: &'a Config,
    part: &'a str,
    settings: &'a BuildoutSettings,
    options: &'a Options,
    release_url: String,
    binary: String,
    binary_installed: bool,
    config_file: String,
}

/// Execute the show command: print the effective configuration.
pub fn cmd_show(config: &Config, json: bool) -> Result<()> {
    let recipe = load_recipe(config)?;
    let binary = recipe.binary_path();
    let effective = Effective {
        config,
        part: recipe.name(),
        settings: recipe.settings(),
        options: recipe.options(),
        release_url: recipe.release_url(),
        binary_installed: binary.exists(),
        binary: binary.display().to_string(),
        config_file: recipe.config_path().display().to_string(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    println!("Configuration:");
    println!("  CONFIG_FILE: {}", config.config_file.display());
    println!("  PART: {}", effective.part);
    println!("  DIRECTORY: {}", effective.settings.directory.display());
    println!("  BIN_DIRECTORY: {}", effective.settings.bin_directory.display());
    println!("  PARTS_DIRECTORY: {}", effective.settings.parts_directory.display());
    println!("  RELEASE: {}", effective.release_url);
    println!("  PROFILE: {}", recipe.options().profile());
    if effective.binary_installed {
        println!("  Binary: FOUND ({})", effective.binary);
    } else {
        println!("  Binary: NOT FOUND (run 'uwsgi-recipe install' to build)");
    }
    println!("  Config file: {}", effective.config_file);
    println!();
    println!("Options [{}]:", effective.part);
    for (key, value) in recipe.options().iter() {
        if value.contains('\n') {
            println!("  {} =", key);
            for line in value.lines() {
                println!("      {}", line);
            }
        } else {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}
