//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `lifecycle` - `install` and `update`
//! - `show` - `render`, `paths` and `show`

pub mod lifecycle;
pub mod show;

pub use lifecycle::{cmd_install, cmd_update};
pub use show::{cmd_paths, cmd_render, cmd_show};

use anyhow::{Context, Result};

use uwsgi_recipe::buildout::BuildoutFile;
use uwsgi_recipe::config::Config;
use uwsgi_recipe::download::HttpFetcher;
use uwsgi_recipe::process::MakeRunner;
use uwsgi_recipe::recipe::{Collaborators, Recipe};

/// Load the buildout file and build the recipe for the configured part.
pub fn load_recipe(config: &Config) -> Result<Recipe> {
    let file = BuildoutFile::load(&config.config_file)?;
    let settings = file.settings()?;
    let options = file.section(&config.part).with_context(|| {
        format!(
            "Part [{}] is not defined in {}",
            config.part,
            config.config_file.display()
        )
    })?;

    let collaborators = Collaborators {
        fetcher: Box::new(HttpFetcher::new(config.download_options())),
        builder: Box::new(MakeRunner::with_program(config.make_program.clone())),
        ..Collaborators::default()
    };

    Ok(
        Recipe::new(config.part.clone(), settings, options, collaborators)
            .with_default_download_url(config.download_url.clone()),
    )
}
