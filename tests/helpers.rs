//! Shared test utilities for uwsgi-recipe tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

use anyhow::{bail, Result};
use uwsgi_recipe::archive::{find_descriptor_dir, BUILD_DESCRIPTOR};
use uwsgi_recipe::{ArtifactFetcher, Archiver, BuildRunner, BuildoutSettings, Collaborators};

/// Test environment with a temporary buildout layout.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Project root
    pub root: PathBuf,
    pub settings: BuildoutSettings,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let settings = BuildoutSettings::new(&root);
        fs::create_dir_all(&settings.parts_directory).expect("Failed to create parts dir");

        Self {
            _temp_dir: temp_dir,
            root,
            settings,
        }
    }

    /// Create `parts/<name>` as a sibling part.
    pub fn add_part(&self, name: &str) -> PathBuf {
        let dir = self.settings.parts_directory.join(name);
        fs::create_dir_all(&dir).expect("Failed to create part dir");
        dir
    }

    /// Pretend a binary is already installed as `bin/<name>`.
    pub fn install_binary(&self, name: &str) -> PathBuf {
        fs::create_dir_all(&self.settings.bin_directory).expect("Failed to create bin dir");
        let path = self.settings.bin_directory.join(name);
        fs::write(&path, "existing").expect("Failed to write binary");
        path
    }

    /// Write a buildout file at the project root.
    pub fn write_buildout(&self, content: &str) -> PathBuf {
        let path = self.root.join("buildout.cfg");
        fs::write(&path, content).expect("Failed to write buildout.cfg");
        path
    }
}

/// Collaborator calls recorded in order.
pub type Calls = Rc<RefCell<Vec<String>>>;

/// Scratch directories handed to the fetcher and the archiver.
pub type Dirs = Rc<RefCell<Vec<PathBuf>>>;

/// Stage at which the recording collaborators report an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailAt {
    #[default]
    Nowhere,
    Fetch,
    Unpack,
    Build,
}

pub struct RecordingFetcher {
    pub calls: Calls,
    pub dirs: Dirs,
    pub fail_at: FailAt,
}

impl ArtifactFetcher for RecordingFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        self.calls.borrow_mut().push(format!("fetch {}", url));
        self.dirs.borrow_mut().push(dest_dir.to_path_buf());
        let path = dest_dir.join("uwsgi.tar.gz");
        fs::write(&path, "archive")?;
        if self.fail_at == FailAt::Fetch {
            bail!("connection refused");
        }
        Ok(path)
    }
}

pub struct RecordingArchiver {
    pub calls: Calls,
    pub dirs: Dirs,
    pub fail_at: FailAt,
}

impl Archiver for RecordingArchiver {
    fn unpack(&self, _archive: &Path, dest: &Path) -> Result<()> {
        self.calls.borrow_mut().push("unpack".to_string());
        self.dirs.borrow_mut().push(dest.to_path_buf());
        let root = dest.join("uwsgi-2.0.28");
        fs::create_dir_all(&root)?;
        if self.fail_at == FailAt::Unpack {
            bail!("tar: unexpected end of file");
        }
        fs::write(root.join(BUILD_DESCRIPTOR), "")?;
        Ok(())
    }

    fn locate(&self, root: &Path, descriptor: &str) -> Result<Option<PathBuf>> {
        self.calls.borrow_mut().push("locate".to_string());
        Ok(find_descriptor_dir(root, descriptor))
    }
}

pub struct RecordingBuilder {
    pub calls: Calls,
    pub fail_at: FailAt,
}

impl BuildRunner for RecordingBuilder {
    fn build(&self, source_dir: &Path, profile: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("build {}", profile));
        if self.fail_at == FailAt::Build {
            bail!("make: *** [all] Error 1");
        }
        fs::write(source_dir.join("uwsgi"), "built")?;
        Ok(())
    }
}

/// Collaborators that record every call into `calls`.
pub fn recording(calls: &Calls) -> Collaborators {
    recording_with(calls, &Dirs::default(), FailAt::Nowhere)
}

/// Recording collaborators that also collect their scratch directories into
/// `dirs` and fail at `fail_at`.
pub fn recording_with(calls: &Calls, dirs: &Dirs, fail_at: FailAt) -> Collaborators {
    Collaborators {
        fetcher: Box::new(RecordingFetcher {
            calls: calls.clone(),
            dirs: dirs.clone(),
            fail_at,
        }),
        archiver: Box::new(RecordingArchiver {
            calls: calls.clone(),
            dirs: dirs.clone(),
            fail_at,
        }),
        builder: Box::new(RecordingBuilder {
            calls: calls.clone(),
            fail_at,
        }),
    }
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file at {}", path.display());
}
