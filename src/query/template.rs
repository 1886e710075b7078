//! Block-structured query templates
//!
//! A template is plain text. A block starts at a line with no leading
//! whitespace and runs through the indented lines after it. Lines whose first
//! non-blank characters are `--` are comments and blank lines are dropped.
//! Each block becomes one query.
//!
//! Parameters are substituted by whole identifier: with `DESIGN` and
//! `DESIGN_ID` both bound, `DESIGN_ID` in the text only ever receives the
//! value of `DESIGN_ID`.

use rust_embed::Embed;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::error::{Error, Result};
use crate::core::scalar::Scalar;

#[derive(Embed)]
#[folder = "queries/"]
struct BuiltinQueries;

/// Leading marker of a comment line
pub const COMMENT_MARKER: &str = "--";

/// Extension tried when a template name has none
pub const TEMPLATE_EXTENSION: &str = "sql";

/// Label used for the embedded templates in search listings
const BUILTIN_LABEL: &str = "<builtin>";

/// Where a template was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Builtin,
}

/// A parsed template: its blocks, not yet substituted
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub source: TemplateSource,
    blocks: Vec<String>,
}

impl Template {
    pub fn parse(name: impl Into<String>, source: TemplateSource, text: &str) -> Self {
        Self {
            name: name.into(),
            source,
            blocks: split_blocks(text),
        }
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// Substitute `params` into every block
    pub fn render(&self, params: &BTreeMap<String, Scalar>) -> Result<Vec<String>> {
        check_keys(params)?;
        Ok(self
            .blocks
            .iter()
            .map(|block| substitute(block, params))
            .collect())
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with(COMMENT_MARKER)
}

/// Split template text into query blocks
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() || is_comment(line) {
            continue;
        }
        let indented = line.starts_with(char::is_whitespace);
        match blocks.last_mut() {
            Some(block) if indented => block.push(line),
            _ => blocks.push(vec![line]),
        }
    }

    blocks.into_iter().map(|lines| lines.join("\n")).collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Template keys must be identifiers to be matchable
pub fn check_keys(params: &BTreeMap<String, Scalar>) -> Result<()> {
    for key in params.keys() {
        if key.is_empty() || !key.chars().all(is_ident_char) {
            return Err(Error::InvalidTemplateKey { key: key.clone() });
        }
    }
    Ok(())
}

/// Replace every identifier equal to a key with the string form of its value
pub fn substitute(text: &str, params: &BTreeMap<String, Scalar>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut ident_start: Option<usize> = None;

    let flush = |out: &mut String, ident: &str| match params.get(ident) {
        Some(value) => out.push_str(&value.to_string()),
        None => out.push_str(ident),
    };

    for (idx, c) in text.char_indices() {
        if is_ident_char(c) {
            if ident_start.is_none() {
                ident_start = Some(idx);
            }
            continue;
        }
        if let Some(start) = ident_start.take() {
            flush(&mut out, &text[start..idx]);
        }
        out.push(c);
    }
    if let Some(start) = ident_start {
        flush(&mut out, &text[start..]);
    }

    out
}

/// Resolves template names against a search path, then the built-in set
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    search_path: Vec<PathBuf>,
}

impl TemplateLoader {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    fn candidates(dir: &Path, name: &str) -> [PathBuf; 2] {
        [
            dir.join(name),
            dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION)),
        ]
    }

    /// Load and parse the template called `name`
    pub fn load(&self, name: &str) -> Result<Template> {
        for dir in &self.search_path {
            for path in Self::candidates(dir, name) {
                if path.is_file() {
                    let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
                    tracing::debug!(template = name, path = %path.display(), "loaded query template");
                    return Ok(Template::parse(name, TemplateSource::File(path), &text));
                }
            }
        }

        let builtin = BuiltinQueries::get(name)
            .or_else(|| BuiltinQueries::get(&format!("{}.{}", name, TEMPLATE_EXTENSION)));
        if let Some(file) = builtin {
            let text = String::from_utf8_lossy(&file.data);
            return Ok(Template::parse(name, TemplateSource::Builtin, &text));
        }

        let mut searched: Vec<String> = self
            .search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        searched.push(BUILTIN_LABEL.to_string());
        Err(Error::TemplateNotFound {
            name: name.to_string(),
            searched,
        })
    }

    /// Every template name reachable through this loader
    pub fn list(&self) -> Vec<String> {
        let mut names = BTreeSet::new();

        for dir in &self.search_path {
            for entry in WalkDir::new(dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                if path.extension().map_or(false, |e| e == TEMPLATE_EXTENSION) {
                    if let Ok(rel) = path.strip_prefix(dir) {
                        let name = rel.with_extension("");
                        names.insert(name.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
        }

        for file in BuiltinQueries::iter() {
            let name = file.as_ref();
            names.insert(
                name.strip_suffix(&format!(".{}", TEMPLATE_EXTENSION))
                    .unwrap_or(name)
                    .to_string(),
            );
        }

        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn params(pairs: &[(&str, Scalar)]) -> BTreeMap<String, Scalar> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_blocks_follow_indentation() {
        let text = "\
-- header comment
SELECT 1
    FROM a
    -- indented comment
    WHERE x = 1

SELECT 2
  FROM b
SELECT 3
";
        let blocks = split_blocks(text);
        assert_eq!(
            blocks,
            vec![
                "SELECT 1\n    FROM a\n    WHERE x = 1".to_string(),
                "SELECT 2\n  FROM b".to_string(),
                "SELECT 3".to_string(),
            ]
        );
    }

    #[test]
    fn test_leading_indented_line_starts_a_block() {
        let blocks = split_blocks("    SELECT 1\n    FROM a\nSELECT 2");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "    SELECT 1\n    FROM a");
    }

    #[test]
    fn test_substitution_matches_whole_identifiers_only() {
        let p = params(&[
            ("DESIGN", Scalar::from("quad")),
            ("DESIGN_ID", Scalar::Int(7)),
        ]);
        let out = substitute("name = 'DESIGN' AND id = DESIGN_ID AND x = MYDESIGN", &p);
        assert_eq!(out, "name = 'quad' AND id = 7 AND x = MYDESIGN");
    }

    #[test]
    fn test_substitution_at_text_edges() {
        let p = params(&[("A", Scalar::Float(2.5))]);
        assert_eq!(substitute("A", &p), "2.5");
        assert_eq!(substitute("A+A", &p), "2.5+2.5");
        assert_eq!(substitute("", &p), "");
    }

    #[test]
    fn test_non_identifier_keys_rejected() {
        let template = Template::parse("t", TemplateSource::Builtin, "SELECT x");
        let err = template
            .render(&params(&[("my-key", Scalar::Int(1))]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplateKey { ref key } if key == "my-key"));
    }

    #[test]
    fn test_search_path_order_then_builtin() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(second.path().join("probe.sql"), "SELECT 'second'").unwrap();
        fs::write(first.path().join("probe.sql"), "SELECT 'first'").unwrap();

        let loader = TemplateLoader::new(vec![first.path().into(), second.path().into()]);
        let template = loader.load("probe").unwrap();
        assert_eq!(template.blocks(), ["SELECT 'first'".to_string()]);

        let builtin = loader.load("design_export").unwrap();
        assert_eq!(builtin.source, TemplateSource::Builtin);
        assert_eq!(builtin.blocks().len(), 4);
    }

    #[test]
    fn test_missing_template_lists_search_path() {
        let dir = tempdir().unwrap();
        let loader = TemplateLoader::new(vec![dir.path().into()]);
        let err = loader.load("nope").unwrap_err();
        match err {
            Error::TemplateNotFound { name, searched } => {
                assert_eq!(name, "nope");
                assert_eq!(searched.len(), 2);
                assert_eq!(searched[1], "<builtin>");
            }
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_list_includes_nested_and_builtin() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("reports")).unwrap();
        fs::write(dir.path().join("reports/mass.sql"), "SELECT 1").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let loader = TemplateLoader::new(vec![dir.path().into()]);
        let names = loader.list();
        assert!(names.contains(&"reports/mass".to_string()));
        assert!(names.contains(&"design_export".to_string()));
        assert!(!names.iter().any(|n| n.contains("notes")));
    }
}
