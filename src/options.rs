//! Declarative per-part options.
//!
//! Options keep their insertion order: lookups are by exact key, but the
//! order of `xml-*` entries decides the order of elements in the generated
//! configuration document.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Canonical key for the per-part search-path list.
pub const EXTRA_PATHS: &str = "extra-paths";
/// Legacy alias of [`EXTRA_PATHS`].
pub const PYTHONPATH: &str = "pythonpath";
/// Newline-separated list of `.pth` files or site directories.
pub const PTH_FILES: &str = "pth-files";
/// Prefix of options rendered into the configuration document.
pub const XML_PREFIX: &str = "xml-";

/// Release used when no `version` option is given.
pub const DEFAULT_VERSION: &str = "latest";
/// Build profile used when no `profile` option is given.
pub const DEFAULT_PROFILE: &str = "default.ini";

/// Ordered string-to-string option map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, String)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Reconcile `extra-paths` with its legacy alias `pythonpath`.
    ///
    /// When `extra-paths` is set it wins and is mirrored into `pythonpath`.
    /// Otherwise `extra-paths` takes the alias value, or the empty string.
    pub fn normalize_extra_paths(&mut self) {
        if let Some(extra) = self.get(EXTRA_PATHS).map(str::to_string) {
            self.insert(PYTHONPATH, extra);
        } else {
            let alias = self.get(PYTHONPATH).unwrap_or_default().to_string();
            self.insert(EXTRA_PATHS, alias);
        }
    }

    pub fn version(&self) -> &str {
        self.get("version").unwrap_or(DEFAULT_VERSION)
    }

    pub fn profile(&self) -> &str {
        self.get("profile").unwrap_or(DEFAULT_PROFILE)
    }

    /// Expected SHA256 of the release archive, when pinned.
    pub fn sha256(&self) -> Option<&str> {
        self.get("sha256").map(str::trim).filter(|s| !s.is_empty())
    }

    /// Base URL override for release downloads.
    pub fn download_url(&self) -> Option<&str> {
        self.get("download-url").map(str::trim).filter(|s| !s.is_empty())
    }

    /// Per-part search paths, one per non-blank line.
    pub fn extra_paths(&self) -> Vec<String> {
        split_lines(self.get(EXTRA_PATHS).unwrap_or_default())
    }

    /// Indirection entries, one per non-blank line.
    pub fn pth_files(&self) -> Vec<String> {
        split_lines(self.get(PTH_FILES).unwrap_or_default())
    }

    /// `(tag, value)` pairs of every `xml-<tag>` option, in option order.
    pub fn xml_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter_map(|(key, value)| {
            key.strip_prefix(XML_PREFIX)
                .filter(|tag| !tag.is_empty())
                .map(|tag| (tag, value))
        })
    }
}

/// Serialized as a map, keeping option order.
impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (k, v) in iter {
            options.insert(k, v);
        }
        options
    }
}

/// Split a multi-line option value into trimmed, non-blank lines.
pub fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
