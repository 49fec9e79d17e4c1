//! uwsgi-recipe: fetch, compile and install uWSGI, and generate its XML
//! configuration from buildout-style options.
//!
//! The pieces compose bottom-up:
//! - [`options`] and [`buildout`] read the declarative configuration
//! - [`paths`] resolves the ordered search-path list
//! - [`render`] turns options and paths into `uwsgi.xml`
//! - [`recipe`] runs the install/update lifecycle over the
//!   [`download`], [`archive`] and [`process`] collaborators

pub mod archive;
pub mod buildout;
pub mod config;
pub mod download;
pub mod options;
pub mod paths;
pub mod process;
pub mod recipe;
pub mod render;
pub mod timing;

pub use buildout::{BuildoutFile, BuildoutSettings};
pub use options::Options;
pub use recipe::{ArtifactFetcher, Archiver, BuildRunner, Collaborators, Recipe};
