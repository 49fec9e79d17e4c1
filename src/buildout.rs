//! Buildout-style configuration files.
//!
//! The file is INI-like:
//!
//! ```text
//! [buildout]
//! parts = uwsgi
//! extra-paths = ${buildout:directory}/src
//!
//! [uwsgi]
//! version = 2.0.28
//! xml-socket = 127.0.0.1:3031
//! extra-paths =
//!     /opt/app/lib
//!     /opt/app/vendor
//! ```
//!
//! Indented lines continue the previous value. `${section:option}` is replaced
//! by the referenced option (`${:option}` refers to the current section) and
//! `$$` is a literal `$`.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::options::{split_lines, Options};

/// Name of the shared section.
pub const BUILDOUT_SECTION: &str = "buildout";

/// Parsed configuration file, values not yet substituted.
#[derive(Debug, Clone, Default)]
pub struct BuildoutFile {
    sections: Vec<(String, Options)>,
}

impl BuildoutFile {
    /// Read and parse `path`, filling in the directory defaults of the
    /// `[buildout]` section relative to the file's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read buildout config {}", path.display()))?;
        let mut file = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let base_dir = base_dir.canonicalize().unwrap_or(base_dir);
        file.apply_defaults(&base_dir)?;
        Ok(file)
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let mut sections: Vec<(String, Options)> = Vec::new();
        let mut current_key: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let lineno = idx + 1;

            if raw.starts_with('#') || raw.starts_with(';') {
                continue;
            }

            if raw.starts_with(char::is_whitespace) {
                let line = raw.trim();
                if line.is_empty() {
                    continue;
                }
                let (Some(key), Some((_, options))) = (&current_key, sections.last_mut()) else {
                    bail!("line {}: continuation line without an option", lineno);
                };
                let value = options.get(key).unwrap_or_default();
                let joined = if value.is_empty() {
                    line.to_string()
                } else {
                    format!("{}\n{}", value, line)
                };
                options.insert(key.clone(), joined);
                continue;
            }

            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    bail!("line {}: unterminated section header", lineno);
                };
                let name = name.trim().to_string();
                if !sections.iter().any(|(n, _)| *n == name) {
                    sections.push((name.clone(), Options::new()));
                }
                // Re-opened sections continue where they were.
                if let Some(pos) = sections.iter().position(|(n, _)| *n == name) {
                    let section = sections.remove(pos);
                    sections.push(section);
                }
                current_key = None;
                continue;
            }

            let Some((_, options)) = sections.last_mut() else {
                bail!("line {}: option outside of any section", lineno);
            };
            let Some(split) = line.find(['=', ':']) else {
                bail!("line {}: expected 'key = value'", lineno);
            };
            let key = line[..split].trim();
            if key.is_empty() {
                bail!("line {}: empty option name", lineno);
            }
            let value = line[split + 1..].trim();
            options.insert(key, value);
            current_key = Some(key.to_string());
        }

        Ok(Self { sections })
    }

    /// Raw (unsubstituted) options of a section.
    pub fn raw_section(&self, name: &str) -> Option<&Options> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, options)| options)
    }

    fn raw_section_mut(&mut self, name: &str) -> &mut Options {
        if self.raw_section(name).is_none() {
            self.sections.push((name.to_string(), Options::new()));
        }
        let pos = self
            .sections
            .iter()
            .position(|(n, _)| n == name)
            .unwrap_or(self.sections.len() - 1);
        &mut self.sections[pos].1
    }

    /// Options of `name` with every `${...}` reference substituted.
    pub fn section(&self, name: &str) -> Result<Options> {
        let raw = self
            .raw_section(name)
            .with_context(|| format!("Section [{}] not found", name))?;

        let mut resolved = Options::new();
        for (key, value) in raw.iter() {
            let mut stack = vec![(name.to_string(), key.to_string())];
            let value = self
                .substitute(value, name, &mut stack)
                .with_context(|| format!("Failed to resolve ${{{}:{}}}", name, key))?;
            resolved.insert(key, value);
        }
        Ok(resolved)
    }

    /// Shared settings from the `[buildout]` section.
    pub fn settings(&self) -> Result<BuildoutSettings> {
        let section = self.section(BUILDOUT_SECTION)?;
        BuildoutSettings::from_section(&section)
    }

    fn lookup(&self, section: &str, key: &str) -> Result<&str> {
        let Some(options) = self.raw_section(section) else {
            bail!("Referenced section [{}] does not exist", section);
        };
        options
            .get(key)
            .with_context(|| format!("Referenced option ${{{}:{}}} does not exist", section, key))
    }

    fn substitute(
        &self,
        value: &str,
        current: &str,
        stack: &mut Vec<(String, String)>,
    ) -> Result<String> {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("$$") {
                out.push('$');
                rest = after;
                continue;
            }
            let Some(body) = tail.strip_prefix("${") else {
                out.push('$');
                rest = &tail[1..];
                continue;
            };
            let Some(end) = body.find('}') else {
                bail!("Unterminated reference in '{}'", value);
            };
            let reference = &body[..end];
            let Some((section, key)) = reference.split_once(':') else {
                bail!("Reference ${{{}}} must have the form ${{section:option}}", reference);
            };
            let section = if section.is_empty() { current } else { section };
            let target = (section.to_string(), key.to_string());

            if stack.contains(&target) {
                bail!("Circular reference to ${{{}:{}}}", section, key);
            }
            stack.push(target);
            let raw = self.lookup(section, key)?;
            let resolved = self.substitute(raw, section, stack)?;
            stack.pop();

            out.push_str(&resolved);
            rest = &body[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Make `directory`, `bin-directory` and `parts-directory` absolute.
    fn apply_defaults(&mut self, base_dir: &Path) -> Result<()> {
        let directory = match self
            .raw_section(BUILDOUT_SECTION)
            .and_then(|s| s.get("directory"))
        {
            Some(raw) => {
                let mut stack = vec![(BUILDOUT_SECTION.to_string(), "directory".to_string())];
                let value = self.substitute(raw, BUILDOUT_SECTION, &mut stack)?;
                absolutize(base_dir, &value)
            }
            None => base_dir.to_path_buf(),
        };

        // Later keys may reference ${buildout:directory}.
        self.raw_section_mut(BUILDOUT_SECTION)
            .insert("directory", directory.to_string_lossy());

        for (key, default) in [("bin-directory", "bin"), ("parts-directory", "parts")] {
            let value = match self
                .raw_section(BUILDOUT_SECTION)
                .and_then(|s| s.get(key))
            {
                Some(raw) => {
                    let mut stack = vec![(BUILDOUT_SECTION.to_string(), key.to_string())];
                    self.substitute(raw, BUILDOUT_SECTION, &mut stack)?
                }
                None => default.to_string(),
            };
            let path = absolutize(&directory, &value);
            self.raw_section_mut(BUILDOUT_SECTION)
                .insert(key, path.to_string_lossy());
        }
        Ok(())
    }
}

fn absolutize(base: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value.trim());
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Shared configuration surface consumed by every part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildoutSettings {
    /// Project root.
    pub directory: PathBuf,
    /// Where built binaries are placed.
    pub bin_directory: PathBuf,
    /// Parent of every part's working directory.
    pub parts_directory: PathBuf,
    /// Global search paths shared across parts.
    pub extra_paths: Option<String>,
}

impl BuildoutSettings {
    /// Settings rooted at `directory` with the conventional `bin/` and
    /// `parts/` subdirectories.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        Self {
            bin_directory: directory.join("bin"),
            parts_directory: directory.join("parts"),
            directory,
            extra_paths: None,
        }
    }

    /// Build settings from a resolved `[buildout]` section.
    pub fn from_section(section: &Options) -> Result<Self> {
        let directory = section
            .get("directory")
            .map(PathBuf::from)
            .context("[buildout] has no 'directory'")?;
        let bin_directory = section
            .get("bin-directory")
            .map(|v| absolutize(&directory, v))
            .unwrap_or_else(|| directory.join("bin"));
        let parts_directory = section
            .get("parts-directory")
            .map(|v| absolutize(&directory, v))
            .unwrap_or_else(|| directory.join("parts"));

        Ok(Self {
            directory,
            bin_directory,
            parts_directory,
            extra_paths: section.get("extra-paths").map(str::to_string),
        })
    }

    /// Global search paths, one per non-blank line.
    pub fn global_extra_paths(&self) -> Vec<String> {
        self.extra_paths
            .as_deref()
            .map(split_lines)
            .unwrap_or_default()
    }

    /// Installed binary location for part `name`.
    pub fn binary_path(&self, name: &str) -> PathBuf {
        self.bin_directory.join(name)
    }

    /// Working directory of part `name`.
    pub fn part_directory(&self, name: &str) -> PathBuf {
        self.parts_directory.join(name)
    }
}
