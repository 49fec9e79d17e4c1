//! Search-path resolution.
//!
//! The resolved list is, in order: the project root, every sibling part
//! directory, the part's own `extra-paths`, paths discovered through `.pth`
//! indirection files, and the global `extra-paths`. Order is precedence, so
//! nothing is ever de-duplicated or re-sorted.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::{debug, info, warn};

use crate::options::Options;

/// Immediate subdirectories of the parts directory, in listing order.
///
/// A missing or unreadable parts directory contributes nothing.
pub fn list_sibling_parts(parts_dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(parts_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list parts directory {}: {}", parts_dir.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}

/// Paths listed by the `.pth` indirection entries in `pth_files`.
///
/// Each entry is either a site directory (all of its `*.pth` files are read in
/// name order) or a single `.pth` file (read relative to its own directory).
/// An entry that yields nothing is logged as a warning and skipped.
pub fn discover_indirected_paths(pth_files: &[String]) -> Vec<String> {
    let mut discovered = Vec::new();

    for entry in pth_files {
        let found = read_site_entry(Path::new(entry));
        if found.is_empty() {
            warn!("No site *.pth libraries found for pth_file={}", entry);
        } else {
            info!("Adding *.pth libraries={:?}", found);
            discovered.extend(found);
        }
    }

    discovered
}

fn read_site_entry(entry: &Path) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    if entry.is_dir() {
        let mut names: Vec<PathBuf> = match fs::read_dir(entry) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "pth") && p.is_file())
                .collect(),
            Err(_) => return found,
        };
        names.sort();
        for pth in names {
            read_pth_file(entry, &pth, &mut seen, &mut found);
        }
    } else if entry.is_file() {
        let site_dir = entry.parent().unwrap_or_else(|| Path::new("."));
        read_pth_file(site_dir, entry, &mut seen, &mut found);
    }

    found
}

fn read_pth_file(site_dir: &Path, pth: &Path, seen: &mut HashSet<PathBuf>, found: &mut Vec<String>) {
    let content = match fs::read_to_string(pth) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", pth.display(), e);
            return;
        }
    };

    for line in content.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if line.starts_with("import ") || line.starts_with("import\t") {
            debug!("Skipping executable line in {}: {}", pth.display(), line);
            continue;
        }
        let dir = site_dir.join(line.trim_end());
        if dir.exists() && seen.insert(dir.clone()) {
            found.push(dir.to_string_lossy().into_owned());
        }
    }
}

/// Replace `/` with the host path separator.
pub fn normalize_separators(path: &str) -> String {
    if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace('/', &MAIN_SEPARATOR.to_string())
    }
}

/// Concatenate every path source in precedence order.
pub fn merge(
    project_root: &Path,
    sibling_parts: &[PathBuf],
    explicit: &[String],
    discovered: &[String],
    global: &[String],
) -> Vec<String> {
    let mut paths = Vec::with_capacity(
        1 + sibling_parts.len() + explicit.len() + discovered.len() + global.len(),
    );
    paths.push(project_root.to_string_lossy().into_owned());
    paths.extend(sibling_parts.iter().map(|p| p.to_string_lossy().into_owned()));
    paths.extend(explicit.iter().map(|p| normalize_separators(p)));
    paths.extend(discovered.iter().map(|p| normalize_separators(p)));
    paths.extend(global.iter().map(|p| normalize_separators(p)));
    paths
}

/// Resolve the full search-path list for one part.
///
/// `options` should already have gone through
/// [`Options::normalize_extra_paths`].
pub fn resolve_extra_paths(
    project_root: &Path,
    sibling_parts: &[PathBuf],
    options: &Options,
    global_extra_paths: &[String],
) -> Vec<String> {
    let discovered = if options.contains(crate::options::PTH_FILES) {
        discover_indirected_paths(&options.pth_files())
    } else {
        Vec::new()
    };

    merge(
        project_root,
        sibling_parts,
        &options.extra_paths(),
        &discovered,
        global_extra_paths,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_paths_follow_root() {
        let options: Options = [("extra-paths", "/x\n/y")].into_iter().collect();
        let paths = resolve_extra_paths(Path::new("/proj"), &[], &options, &[]);
        assert_eq!(paths, strings(&["/proj", "/x", "/y"]));
    }

    #[test]
    fn test_merge_keeps_duplicates_and_order() {
        let paths = merge(
            Path::new("/A"),
            &[PathBuf::from("/B")],
            &strings(&["/A"]),
            &[],
            &[],
        );
        assert_eq!(paths, strings(&["/A", "/B", "/A"]));
    }

    #[test]
    fn test_merge_source_order() {
        let paths = merge(
            Path::new("/root"),
            &[PathBuf::from("/parts/a")],
            &strings(&["/explicit"]),
            &strings(&["/discovered"]),
            &strings(&["/global"]),
        );
        assert_eq!(
            paths,
            strings(&["/root", "/parts/a", "/explicit", "/discovered", "/global"])
        );
    }

    #[test]
    fn test_list_sibling_parts_only_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("one")).unwrap();
        fs::create_dir(temp.path().join("two")).unwrap();
        fs::write(temp.path().join("file.txt"), "x").unwrap();

        let mut parts = list_sibling_parts(temp.path());
        parts.sort();
        assert_eq!(parts, vec![temp.path().join("one"), temp.path().join("two")]);
    }

    #[test]
    fn test_list_sibling_parts_missing_dir() {
        assert!(list_sibling_parts(Path::new("/nonexistent_parts_12345")).is_empty());
    }

    #[test]
    fn test_discover_from_site_dir() {
        let temp = TempDir::new().unwrap();
        let site = temp.path();
        fs::create_dir(site.join("lib_a")).unwrap();
        fs::create_dir(site.join("lib_b")).unwrap();
        fs::write(
            site.join("a.pth"),
            "# comment\nlib_a\nimport os; os.system('true')\nmissing_dir\n",
        )
        .unwrap();
        fs::write(site.join("b.pth"), "lib_b\nlib_a\n").unwrap();

        let found = discover_indirected_paths(&[site.to_string_lossy().into_owned()]);
        assert_eq!(
            found,
            vec![
                site.join("lib_a").to_string_lossy().into_owned(),
                site.join("lib_b").to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn test_discover_from_single_pth_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("pkg")).unwrap();
        let pth = temp.path().join("extra.pth");
        fs::write(&pth, "pkg\n").unwrap();

        let found = discover_indirected_paths(&[pth.to_string_lossy().into_owned()]);
        assert_eq!(found, vec![temp.path().join("pkg").to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_discover_missing_entry_contributes_nothing() {
        let found = discover_indirected_paths(&strings(&["/nonexistent_site_12345"]));
        assert!(found.is_empty());
    }

    #[test]
    fn test_resolve_appends_discovered_after_explicit() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("x.pth"), "lib\n").unwrap();

        let options: Options = [
            ("extra-paths", "/explicit".to_string()),
            ("pth-files", temp.path().to_string_lossy().into_owned()),
        ]
        .into_iter()
        .collect();

        let paths = resolve_extra_paths(Path::new("/proj"), &[], &options, &strings(&["/g"]));
        assert_eq!(
            paths,
            vec![
                "/proj".to_string(),
                "/explicit".to_string(),
                temp.path().join("lib").to_string_lossy().into_owned(),
                "/g".to_string(),
            ]
        );
    }
}
