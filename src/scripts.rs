//! SQL script library.
//!
//! Transformation scripts live as `.sql` files in one directory and are
//! addressed by file name. A script may carry `$identifier` placeholders; the
//! placeholder set is read straight from the text, and rendering requires a
//! value for every one of them (prompting is left to the console layer).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{F1dbError, F1dbResult};

/// Placeholder name (without the `$`) -> substituted text.
pub type ScriptParams = BTreeMap<String, String>;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z0-9_]+)").unwrap());
static LITERAL_OR_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)'(?:[^']|'')*'|--[^\n]*|/\*.*?(?:\*/|$)").unwrap());
static TRANSACTION_CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*(?:(?:BEGIN|COMMIT|ROLLBACK|VACUUM|SAVEPOINT|RELEASE)\b|END(?:\s+TRANSACTION)?\s*(?:;|$))")
        .unwrap()
});

// Comments dropped and string literals emptied, so keyword checks only see code.
fn code_only(sql: &str) -> String {
    LITERAL_OR_COMMENT
        .replace_all(sql, |caps: &Captures<'_>| if caps[0].starts_with('\'') { "''" } else { " " })
        .into_owned()
}

/// Nothing but whitespace, comments and semicolons.
pub fn is_blank(sql: &str) -> bool {
    code_only(sql).trim_matches(|c: char| c.is_whitespace() || c == ';').is_empty()
}

/// True when any statement opens, closes or steps outside a transaction
/// itself (`BEGIN`, `COMMIT`, `END`, `ROLLBACK`, `SAVEPOINT`, `RELEASE`,
/// `VACUUM`). Such scripts cannot run inside another transaction.
pub fn controls_transactions(sql: &str) -> bool { TRANSACTION_CONTROL.is_match(&code_only(sql)) }

#[derive(Clone, Debug)]
pub struct ScriptLibrary {
    dir: PathBuf,
}

impl ScriptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    #[inline]
    fn file_name(name: &str) -> String {
        if name.ends_with(".sql") { name.to_string() } else { format!("{name}.sql") }
    }

    /// Read a script by name; `retirements` and `retirements.sql` are the same script.
    pub fn load(&self, name: &str) -> F1dbResult<SqlScript> {
        let file_name = Self::file_name(name);
        let path = self.dir.join(&file_name);
        if !path.is_file() {
            return Err(F1dbError::UnknownScript { name: file_name, dir: self.dir.clone() });
        }
        let text = fs::read_to_string(&path)?;
        debug!(script = %file_name, bytes = text.len(), "loaded script");
        Ok(SqlScript::new(file_name, text))
    }

    /// Sorted file names of every `.sql` script in the directory.
    pub fn list(&self) -> F1dbResult<Vec<String>> {
        let mut names = Vec::new();
        for ent in fs::read_dir(&self.dir)? {
            let p = ent?.path();
            let is_sql = p.extension().and_then(|e| e.to_str()).unwrap_or("").eq_ignore_ascii_case("sql");
            if p.is_file() && is_sql {
                if let Some(name) = p.file_name().and_then(|s| s.to_str()) { names.push(name.to_string()); }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlScript {
    name: String,
    text: String,
}

impl SqlScript {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn text(&self) -> &str { &self.text }

    /// Placeholder names the script expects, without the leading `$`.
    pub fn placeholders(&self) -> BTreeSet<String> {
        PLACEHOLDER.captures_iter(&self.text).map(|c| c[1].to_string()).collect()
    }

    pub fn missing(&self, params: &ScriptParams) -> Vec<String> {
        self.placeholders().into_iter().filter(|p| !params.contains_key(p)).collect()
    }

    /// Substitute every placeholder. Values are spliced in verbatim, so they
    /// must already be valid SQL fragments (numbers, quoted strings).
    pub fn render(&self, params: &ScriptParams) -> F1dbResult<String> {
        let missing = self.missing(params);
        if !missing.is_empty() {
            return Err(F1dbError::MissingParameters { script: self.name.clone(), names: missing });
        }
        let rendered = PLACEHOLDER.replace_all(&self.text, |caps: &Captures<'_>| {
            params.get(&caps[1]).cloned().unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod scripts_tests;
