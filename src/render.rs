//! uWSGI XML configuration rendering.
//!
//! Every `xml-<tag>` option becomes one or more `<tag>` elements:
//!
//! | value                | output                           |
//! |----------------------|----------------------------------|
//! | `true` (any case)    | `<tag/>`                         |
//! | `false` or empty     | nothing                          |
//! | contains a newline   | one element per whitespace token |
//! | anything else        | `<tag>value</tag>`               |
//!
//! Values are written verbatim. Nothing is escaped and tag names are not
//! validated, so options must already be markup-safe.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::options::Options;

/// File name of the generated configuration inside the part directory.
pub const CONFIG_FILE_NAME: &str = "uwsgi.xml";

/// Root element of the document.
pub const ROOT_ELEMENT: &str = "uwsgi";

/// Element used for each resolved search path.
pub const PATH_ELEMENT: &str = "pythonpath";

/// Element lines for the `xml-*` options, without the root element.
pub fn render_body(options: &Options, resolved_paths: &[String]) -> String {
    let mut body = String::new();

    for (tag, value) in options.xml_entries() {
        let lowered = value.to_lowercase();
        if lowered == "true" {
            let _ = writeln!(body, "<{}/>", tag);
        } else if value.is_empty() || lowered == "false" {
            continue;
        } else if value.contains('\n') {
            for token in value.split_whitespace() {
                let _ = writeln!(body, "<{0}>{1}</{0}>", tag, token);
            }
        } else {
            let _ = writeln!(body, "<{0}>{1}</{0}>", tag, value);
        }
    }

    for path in resolved_paths {
        let _ = writeln!(body, "<{0}>{1}</{0}>", PATH_ELEMENT, path);
    }

    body
}

/// Complete configuration document.
pub fn render(options: &Options, resolved_paths: &[String]) -> String {
    format!(
        "<{root}>\n{body}</{root}>",
        root = ROOT_ELEMENT,
        body = render_body(options, resolved_paths)
    )
}

/// Location of the configuration file inside a part directory.
pub fn config_path(part_dir: &Path) -> PathBuf {
    part_dir.join(CONFIG_FILE_NAME)
}

/// Write `document` to `{part_dir}/uwsgi.xml`.
///
/// The part directory is created if needed; an existing one is fine.
pub fn write_config(part_dir: &Path, document: &str) -> Result<PathBuf> {
    fs::create_dir_all(part_dir)
        .with_context(|| format!("Failed to create part directory {}", part_dir.display()))?;
    let path = config_path(part_dir);
    fs::write(&path, document)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(pairs: &[(&str, &str)]) -> Options {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_empty_document() {
        let doc = render(&options(&[("version", "2.0"), ("socket", ":1")]), &[]);
        assert_eq!(doc, "<uwsgi>\n</uwsgi>");
    }

    #[test]
    fn test_boolean_and_scalar_values() {
        let body = render_body(
            &options(&[("xml-foo", "true"), ("xml-bar", "false"), ("xml-baz", "hello")]),
            &[],
        );
        assert_eq!(body, "<foo/>\n<baz>hello</baz>\n");
    }

    #[test]
    fn test_boolean_case_insensitive() {
        let body = render_body(
            &options(&[("xml-a", "TRUE"), ("xml-b", "False"), ("xml-c", ""), ("xml-d", "True")]),
            &[],
        );
        assert_eq!(body, "<a/>\n<d/>\n");
    }

    #[test]
    fn test_multiline_splits_on_all_whitespace() {
        let body = render_body(&options(&[("xml-foo", "a b\nc")]), &[]);
        assert_eq!(body, "<foo>a</foo>\n<foo>b</foo>\n<foo>c</foo>\n");
    }

    #[test]
    fn test_single_line_kept_verbatim() {
        let body = render_body(&options(&[("xml-env", "A=1 B=2")]), &[]);
        assert_eq!(body, "<env>A=1 B=2</env>\n");
    }

    #[test]
    fn test_values_not_escaped() {
        let body = render_body(&options(&[("xml-x", "<a&b>")]), &[]);
        assert_eq!(body, "<x><a&b></x>\n");
    }

    #[test]
    fn test_paths_appended_after_options() {
        let doc = render(
            &options(&[("xml-master", "true")]),
            &["/proj".to_string(), "/proj".to_string()],
        );
        assert_eq!(
            doc,
            "<uwsgi>\n<master/>\n<pythonpath>/proj</pythonpath>\n<pythonpath>/proj</pythonpath>\n</uwsgi>"
        );
    }

    #[test]
    fn test_option_order_is_document_order() {
        let body = render_body(&options(&[("xml-z", "1"), ("xml-a", "2")]), &[]);
        assert_eq!(body, "<z>1</z>\n<a>2</a>\n");
    }

    #[test]
    fn test_write_config_creates_part_dir() {
        let temp = TempDir::new().unwrap();
        let part_dir = temp.path().join("uwsgi");
        let path = write_config(&part_dir, "<uwsgi>\n</uwsgi>").unwrap();
        assert_eq!(path, temp.path().join("uwsgi/uwsgi.xml"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<uwsgi>\n</uwsgi>");

        // Existing directory is not an error.
        write_config(&part_dir, "<uwsgi>\n<a/>\n</uwsgi>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<uwsgi>\n<a/>\n</uwsgi>");
    }
}
