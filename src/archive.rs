//! Release archive extraction.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::process::Cmd;
use crate::recipe::Archiver;

/// The uWSGI build script; its directory is the build root.
pub const BUILD_DESCRIPTOR: &str = "uwsgiconfig.py";

/// `tar` flags for an archive, picked from its extension.
pub fn tar_flags(archive: &Path) -> &'static str {
    let name = archive.to_string_lossy();
    if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        "xJf"
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        "xzf"
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        "xjf"
    } else {
        "xf"
    }
}

/// Shallowest directory under `root` containing a file named `descriptor`.
///
/// Ties at the same depth go to the first directory in name order.
pub fn find_descriptor_dir(root: &Path, descriptor: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == descriptor)
        .min_by_key(|e| e.depth())
        .and_then(|e| e.path().parent().map(Path::to_path_buf))
}

/// Extracts tarballs with the system `tar`.
#[derive(Debug, Clone, Default)]
pub struct TarArchiver;

impl Archiver for TarArchiver {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        if !archive.is_file() {
            bail!("Archive not found: {}", archive.display());
        }
        fs::create_dir_all(dest)
            .with_context(|| format!("Failed to create directory {}", dest.display()))?;

        Cmd::new("tar")
            .arg(tar_flags(archive))
            .arg_path(archive)
            .arg("-C")
            .arg_path(dest)
            .error_msg(format!("tar extraction failed for {}", archive.display()))
            .run()?;
        Ok(())
    }

    fn locate(&self, root: &Path, descriptor: &str) -> Result<Option<PathBuf>> {
        Ok(find_descriptor_dir(root, descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tar_flags() {
        assert_eq!(tar_flags(Path::new("uwsgi-2.0.tar.gz")), "xzf");
        assert_eq!(tar_flags(Path::new("a.tgz")), "xzf");
        assert_eq!(tar_flags(Path::new("a.tar.xz")), "xJf");
        assert_eq!(tar_flags(Path::new("a.tar.bz2")), "xjf");
        assert_eq!(tar_flags(Path::new("a.tar")), "xf");
    }

    #[test]
    fn test_find_descriptor_prefers_shallowest() {
        let temp = TempDir::new().unwrap();
        let top = temp.path().join("uwsgi-2.0.28");
        let nested = top.join("plugins/python");
        fs::create_dir_all(&nested).unwrap();
        fs::write(top.join(BUILD_DESCRIPTOR), "").unwrap();
        fs::write(nested.join(BUILD_DESCRIPTOR), "").unwrap();

        assert_eq!(find_descriptor_dir(temp.path(), BUILD_DESCRIPTOR), Some(top));
    }

    #[test]
    fn test_find_descriptor_missing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("README"), "").unwrap();
        assert_eq!(find_descriptor_dir(temp.path(), BUILD_DESCRIPTOR), None);
    }

    #[test]
    fn test_unpack_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = TarArchiver
            .unpack(&temp.path().join("none.tar.gz"), &temp.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("Archive not found"));
    }

    #[test]
    fn test_unpack_roundtrip_with_tar() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src/uwsgi-2.0");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join(BUILD_DESCRIPTOR), "# build").unwrap();

        let archive = temp.path().join("uwsgi-2.0.tar.gz");
        Cmd::new("tar")
            .arg("czf")
            .arg_path(&archive)
            .arg("-C")
            .arg_path(&temp.path().join("src"))
            .arg("uwsgi-2.0")
            .run()
            .unwrap();

        let out = temp.path().join("out");
        TarArchiver.unpack(&archive, &out).unwrap();
        let found = TarArchiver.locate(&out, BUILD_DESCRIPTOR).unwrap();
        assert_eq!(found, Some(out.join("uwsgi-2.0")));
    }
}
