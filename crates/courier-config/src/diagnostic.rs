// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors are turned into miette diagnostics that point at the
//! offending key in the TOML file and, for misspelled keys, suggest the
//! closest valid one.

#![allow(unused_assignments)] // emitted by the miette Diagnostic derive

use std::path::Path;

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a valid key needs before it is offered as a fix.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A TOML document that took part in loading, kept for span lookup.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub name: String,
    pub content: String,
}

impl ConfigSource {
    /// Read `path`, or `None` if it does not exist or is unreadable.
    pub fn read(path: &Path) -> Option<Self> {
        std::fs::read_to_string(path).ok().map(|content| Self {
            name: path.display().to_string(),
            content,
        })
    }

    pub fn inline(content: &str) -> Self {
        Self {
            name: "<inline>".to_string(),
            content: content.to_string(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        let name = Path::new(&self.name);
        name == path || path.ends_with(name)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {section}")]
    #[diagnostic(
        code(courier::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// `[section]` name, or "top level".
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(courier::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(courier::config::missing_key),
        help("set `{key}` in courier.toml")
    )]
    MissingKey { key: String },

    /// A value parsed but is out of range or inconsistent with another.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(courier::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(courier::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error inside a figment error into a diagnostic.
pub fn from_figment(err: figment::Error, sources: &[ConfigSource]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, sources))
        .collect()
}

fn convert(error: &figment::Error, sources: &[ConfigSource]) -> ConfigError {
    use figment::error::Kind;

    let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, &section, field, sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                section: if section.is_empty() {
                    "top level".to_string()
                } else {
                    format!("[{}]", section.join("."))
                },
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: dotted(&section, field),
        },
        Kind::InvalidType(actual, expected) => {
            // For type errors figment's path ends with the key itself.
            let (span, src) = match section.split_last() {
                Some((field, parent)) => locate(error, parent, field, sources),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: section.join("."),
                found: actual.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(section: &[String], field: &str) -> String {
    if section.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", section.join("."))
    }
}

/// Span of `field` inside `[section]` of whichever source the error came from.
fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    sources: &[ConfigSource],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let source = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => sources.iter().find(|s| s.matches(path)),
        _ => sources.iter().find(|s| s.name == "<inline>"),
    };
    let Some(source) = source else {
        return (None, None);
    };
    match find_key_offset(&source.content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(&source.name, source.content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside the table named by `section`.
///
/// Tracks the current `[table]` header line by line, so keys with the same
/// name in other tables are never matched.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            current = header
                .split(']')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        } else if current == wanted
            && let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Closest key in `valid_keys` to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each diagnostic to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggests_close_keys() {
        let queue = &["poll_interval_ms", "lease_secs", "max_attempts"];
        assert_eq!(
            suggest_key("pol_interval_ms", queue).as_deref(),
            Some("poll_interval_ms")
        );
        let worker = &["concurrency", "rate_limit_max", "rate_limit_window_ms"];
        assert_eq!(suggest_key("concurency", worker).as_deref(), Some("concurrency"));
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(
            suggest_key("zzzzzz", &["timeout_secs", "cancel_timeout_on_resolve"]),
            None
        );
    }

    #[test]
    fn finds_key_in_nested_table() {
        let content = "[calls]\ntimeout_secs = 30\n\n[workers.bot_response]\nconcurency = 4\n";
        let o = find_key_offset(content, &path(&["workers", "bot_response"]), "concurency")
            .expect("offset");
        assert_eq!(&content[o..o + 10], "concurency");
    }

    #[test]
    fn ignores_same_key_in_other_table() {
        let content = "[queue]\nlease_secs = 1\n\n[presence]\n  lease_secs = 2\n";
        let o = find_key_offset(content, &path(&["presence"]), "lease_secs").expect("offset");
        assert!(o > content.find("[presence]").unwrap());
        assert_eq!(&content[o..o + 10], "lease_secs");
    }

    #[test]
    fn top_level_keys_have_empty_section() {
        let content = "bogus = 1\n[calls]\n";
        assert_eq!(find_key_offset(content, &[], "bogus"), Some(0));
        assert_eq!(find_key_offset(content, &path(&["calls"]), "bogus"), None);
    }
}
