//! Install/update lifecycle for one uWSGI part.
//!
//! `install` builds the binary only when `<bin-directory>/<name>` is missing,
//! then always regenerates the configuration. `update` only regenerates the
//! configuration: sibling parts and `.pth` files can change between runs even
//! when the release options do not.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::archive::{TarArchiver, BUILD_DESCRIPTOR};
use crate::buildout::BuildoutSettings;
use crate::download::{self, HttpFetcher, DEFAULT_DOWNLOAD_URL};
use crate::options::Options;
use crate::paths;
use crate::process::MakeRunner;
use crate::render;
use crate::timing::Timer;

/// Name of the executable produced by the uWSGI build.
pub const BUILT_BINARY_NAME: &str = "uwsgi";

/// Fetches a release archive into `dest_dir` and returns its local path.
pub trait ArtifactFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Unpacks archives and finds the build root inside them.
pub trait Archiver {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Directory containing `descriptor`, if any.
    fn locate(&self, root: &Path, descriptor: &str) -> Result<Option<PathBuf>>;
}

/// Runs the native build in `source_dir` with the given profile.
pub trait BuildRunner {
    fn build(&self, source_dir: &Path, profile: &str) -> Result<()>;
}

/// External collaborators used by [`Recipe::install`].
pub struct Collaborators {
    pub fetcher: Box<dyn ArtifactFetcher>,
    pub archiver: Box<dyn Archiver>,
    pub builder: Box<dyn BuildRunner>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            fetcher: Box::new(HttpFetcher::default()),
            archiver: Box::new(TarArchiver),
            builder: Box::new(MakeRunner::default()),
        }
    }
}

/// One configured uWSGI part.
pub struct Recipe {
    name: String,
    settings: BuildoutSettings,
    options: Options,
    collaborators: Collaborators,
    default_download_url: String,
}

impl Recipe {
    /// Create a recipe for part `name`. `extra-paths` is reconciled with its
    /// legacy alias here.
    pub fn new(
        name: impl Into<String>,
        settings: BuildoutSettings,
        mut options: Options,
        collaborators: Collaborators,
    ) -> Self {
        options.normalize_extra_paths();
        Self {
            name: name.into(),
            settings,
            options,
            collaborators,
            default_download_url: DEFAULT_DOWNLOAD_URL.to_string(),
        }
    }

    /// Base URL used when the part has no `download-url` option.
    pub fn with_default_download_url(mut self, url: impl Into<String>) -> Self {
        self.default_download_url = url.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn settings(&self) -> &BuildoutSettings {
        &self.settings
    }

    /// Installed binary location.
    pub fn binary_path(&self) -> PathBuf {
        self.settings.binary_path(&self.name)
    }

    /// Generated configuration location.
    pub fn config_path(&self) -> PathBuf {
        render::config_path(&self.settings.part_directory(&self.name))
    }

    /// Release archive URL for the configured version.
    pub fn release_url(&self) -> String {
        let base = self
            .options
            .download_url()
            .unwrap_or(self.default_download_url.as_str());
        download::release_url(base, self.options.version())
    }

    /// Search paths for the configuration, in precedence order.
    pub fn resolve_paths(&self) -> Vec<String> {
        let siblings = paths::list_sibling_parts(&self.settings.parts_directory);
        paths::resolve_extra_paths(
            &self.settings.directory,
            &siblings,
            &self.options,
            &self.settings.global_extra_paths(),
        )
    }

    /// The configuration document as it would be written now.
    pub fn render_config(&self) -> String {
        render::render(&self.options, &self.resolve_paths())
    }

    /// Render and write the configuration file.
    pub fn write_config(&self) -> Result<PathBuf> {
        let document = self.render_config();
        let path = render::write_config(&self.settings.part_directory(&self.name), &document)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Build and place the binary if missing, then write the configuration.
    ///
    /// Returns the produced artifacts: the binary when it was built here, and
    /// the configuration file.
    pub fn install(&self) -> Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();

        let binary = self.binary_path();
        if binary.exists() {
            info!("{} already installed, skipping build", binary.display());
        } else {
            artifacts.push(self.build_binary()?);
        }

        artifacts.push(self.write_config()?);
        Ok(artifacts)
    }

    /// Regenerate the configuration without touching the binary.
    pub fn update(&self) -> Result<Vec<PathBuf>> {
        Ok(vec![self.write_config()?])
    }

    fn build_binary(&self) -> Result<PathBuf> {
        let timer = Timer::start(format!("uWSGI {} build", self.options.version()));

        // Both directories are removed when dropped, on success and on error.
        let download_dir = tempfile::Builder::new()
            .prefix("uwsgi-")
            .suffix("-download-cache")
            .tempdir()
            .context("Failed to create download directory")?;
        let extract_dir = tempfile::Builder::new()
            .prefix("uwsgi-")
            .suffix("-extract")
            .tempdir()
            .context("Failed to create extraction directory")?;

        let url = self.release_url();
        let archive = self
            .collaborators
            .fetcher
            .fetch(&url, download_dir.path())
            .with_context(|| format!("Failed to download {}", url))?;

        if let Some(expected) = self.options.sha256() {
            download::verify_sha256(&archive, expected)?;
        }

        self.collaborators
            .archiver
            .unpack(&archive, extract_dir.path())
            .with_context(|| format!("Failed to extract {}", archive.display()))?;

        let Some(source_dir) = self
            .collaborators
            .archiver
            .locate(extract_dir.path(), BUILD_DESCRIPTOR)?
        else {
            bail!(
                "No {} found in {}; is this a uWSGI release?",
                BUILD_DESCRIPTOR,
                url
            );
        };

        info!(
            "Building uWSGI in {} (profile {})",
            source_dir.display(),
            self.options.profile()
        );
        self.collaborators
            .builder
            .build(&source_dir, self.options.profile())?;

        let built = self.built_binary(&source_dir)?;
        let target = self.binary_path();
        fs::create_dir_all(&self.settings.bin_directory).with_context(|| {
            format!(
                "Failed to create bin directory {}",
                self.settings.bin_directory.display()
            )
        })?;
        place_binary(&built, &target)?;
        info!("Installed {}", target.display());

        extract_dir
            .close()
            .context("Failed to remove extraction directory")?;
        download_dir
            .close()
            .context("Failed to remove download directory")?;

        timer.finish();
        Ok(target)
    }

    /// The executable left by the build: `<source>/<name>`, or `<source>/uwsgi`
    /// when the part is named differently.
    fn built_binary(&self, source_dir: &Path) -> Result<PathBuf> {
        [self.name.as_str(), BUILT_BINARY_NAME]
            .into_iter()
            .map(|name| source_dir.join(name))
            .find(|p| p.is_file())
            .with_context(|| {
                format!(
                    "Build finished but no '{}' executable found in {}",
                    BUILT_BINARY_NAME,
                    source_dir.display()
                )
            })
    }
}

/// Copy `built` to `target` through a sibling staging file, so an interrupted
/// copy never leaves a partial binary at `target`.
fn place_binary(built: &Path, target: &Path) -> Result<()> {
    let mut staging = target.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);

    let placed = fs::copy(built, &staging)
        .with_context(|| format!("Failed to copy {} to {}", built.display(), staging.display()))
        .and_then(|_| {
            fs::rename(&staging, target).with_context(|| {
                format!("Failed to move {} to {}", staging.display(), target.display())
            })
        });
    if placed.is_err() {
        let _ = fs::remove_file(&staging);
    }
    placed
}
