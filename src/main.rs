//! uwsgi-recipe - builds uWSGI and writes its configuration.
//!
//! Reads a buildout-style configuration file, downloads and compiles the
//! requested uWSGI release into the bin directory, and renders
//! `parts/<part>/uwsgi.xml` from the part's `xml-*` options and search paths.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uwsgi_recipe::config::Config;

#[derive(Parser)]
#[command(name = "uwsgi-recipe")]
#[command(about = "Build uWSGI and generate its XML configuration")]
#[command(
    after_help = "QUICK START:\n  uwsgi-recipe install  Build uWSGI (if missing) and write uwsgi.xml\n  uwsgi-recipe update   Rewrite uwsgi.xml only\n  uwsgi-recipe render   Print uwsgi.xml without writing it"
)]
struct Cli {
    /// Buildout configuration file (default: $UWSGI_RECIPE_CONFIG or buildout.cfg)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Part (section) to operate on (default: $UWSGI_RECIPE_PART or uwsgi)
    #[arg(short, long, global = true)]
    part: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the binary if it is missing, then write the configuration
    Install {
        /// Print produced artifacts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the configuration without rebuilding
    Update {
        /// Print produced artifacts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the configuration document to stdout
    Render,

    /// Print the resolved search paths in precedence order
    Paths {
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Show {
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::load().with_overrides(cli.config, cli.part);
    tracing::debug!(
        "Using part [{}] of {}",
        config.part,
        config.config_file.display()
    );

    match cli.command {
        Commands::Install { json } => commands::cmd_install(&config, json)?,
        Commands::Update { json } => commands::cmd_update(&config, json)?,
        Commands::Render => commands::cmd_render(&config)?,
        Commands::Paths { json } => commands::cmd_paths(&config, json)?,
        Commands::Show { json } => commands::cmd_show(&config, json)?,
    }

    Ok(())
}
