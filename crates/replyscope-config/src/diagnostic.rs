// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment failures into miette diagnostics.
//!
//! Unknown keys get a "did you mean" hint (Jaro-Winkler via `strsim`) and,
//! when the TOML text that produced them is available, a labelled span.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Below this similarity a key is not offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// TOML text kept around so diagnostics can point into it.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub name: String,
    pub content: String,
}

impl ConfigSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A configuration problem, renderable with miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(section))]
    #[diagnostic(
        code(replyscope::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted section path, empty at the top level.
        section: String,
        suggestion: Option<String>,
        valid_keys: Vec<String>,
        #[label("not a {} setting", section_label(section))]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}, expected {expected}")]
    #[diagnostic(code(replyscope::config::invalid_type))]
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
        code(replyscope::config::missing_key),
        help("set `{key}` in replyscope.toml or through a REPLYSCOPE_* variable")
    )]
    MissingKey { key: String },

    /// A value parsed but breaks a semantic rule.
    #[error("invalid setting: {message}")]
    #[diagnostic(code(replyscope::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(replyscope::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &[String]) -> String {
    let valid = valid_keys.join(", ");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys here: {valid}"),
        None => format!("valid keys here: {valid}"),
    }
}

/// Convert every error carried by `err` into a diagnostic.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[ConfigSource],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            let source = origin(&error, sources);
            match error.kind {
                Kind::UnknownField(key, expected) => {
                    let valid_keys: Vec<String> =
                        expected.iter().map(|k| k.to_string()).collect();
                    let section = path.join(".");
                    let (span, src) = pinpoint(source, &path, &key);
                    ConfigError::UnknownKey {
                        suggestion: suggest_key(&key, expected),
                        key,
                        section,
                        valid_keys,
                        span,
                        src,
                    }
                }
                Kind::MissingField(key) => ConfigError::MissingKey {
                    key: qualified(&path, &key),
                },
                Kind::InvalidType(found, expected) => {
                    let (section, field) = match path.split_last() {
                        Some((field, section)) => (section.to_vec(), field.clone()),
                        None => (Vec::new(), String::new()),
                    };
                    let (span, src) = pinpoint(source, &section, &field);
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: found.to_string(),
                        expected,
                        span,
                        src,
                    }
                }
                other => ConfigError::Other(other.to_string()),
            }
        })
        .collect()
}

fn qualified(path: &[String], key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{key}", path.join("."))
    }
}

/// The source text the error came from. Inline strings have no file
/// metadata, so a lone source is assumed to be the origin.
fn origin<'a>(error: &figment::Error, sources: &'a [ConfigSource]) -> Option<&'a ConfigSource> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    match file {
        Some(file) => sources.iter().find(|s| s.name == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    }
}

fn pinpoint(
    source: Option<&ConfigSource>,
    section: &[String],
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(source) = source else {
        return (None, None);
    };
    match find_key_offset(&source.content, section, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(&source.name, source.content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside the `[section]` table of a TOML document.
///
/// Walks the document line by line tracking the current table header, so a
/// key with the same name in an earlier table is never matched.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .map(|(name, _)| name.trim())
        {
            current = header.to_string();
        } else if current == wanted
            && let Some((name, _)) = trimmed.split_once('=')
            && name.trim_end() == key
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|&(_, score)| score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render diagnostics with miette's graphical handler.
pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    if errors.len() > 1 {
        let _ = writeln!(out, "{} configuration problems found:\n", errors.len());
    }
    for error in errors {
        if handler.render_report(&mut out, error as &dyn Diagnostic).is_err() {
            let _ = writeln!(out, "Error: {error}");
        }
    }
    out
}

/// Render diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_section_key_for_dropped_letter() {
        let valid = &["qr_max_attempts", "qr_window_secs", "event_buffer"];
        assert_eq!(
            suggest_key("qr_windw_secs", valid),
            Some("qr_window_secs".to_string())
        );
    }

    #[test]
    fn suggests_url_for_ulr() {
        let valid = &["url", "connect_timeout_secs", "request_timeout_secs"];
        assert_eq!(suggest_key("ulr", valid), Some("url".to_string()));
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["name", "log_level"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_offset_respects_current_table() {
        let content = "[storage]\nwal_mode = true\n\n[supervisor]\n  wal_mode = 3\n";
        let section = vec!["supervisor".to_string()];
        let o = find_key_offset(content, &section, "wal_mode").unwrap();
        assert!(o > content.find("[supervisor]").unwrap());
        assert_eq!(&content[o..o + 8], "wal_mode");
    }

    #[test]
    fn key_offset_ignores_prefix_matches() {
        let content = "[bridge]\nurl_extra = 1\nurl = \"ws://x\"\n";
        let section = vec!["bridge".to_string()];
        let o = find_key_offset(content, &section, "url").unwrap();
        assert_eq!(&content[o..o + 5], "url =");
    }

    #[test]
    fn unknown_top_level_section_is_labelled() {
        let error = ConfigError::UnknownKey {
            key: "agent".into(),
            section: String::new(),
            suggestion: None,
            valid_keys: vec!["service".into(), "storage".into()],
            span: None,
            src: None,
        };
        assert_eq!(error.to_string(), "unknown key `agent` in the top level");
    }

    #[test]
    fn rendered_validation_error_carries_code() {
        let rendered = render_to_string(&[ConfigError::Validation {
            message: "bridge.url must not be empty".into(),
        }]);
        assert!(rendered.contains("bridge.url must not be empty"));
        assert!(rendered.contains("replyscope::config::validation"));
    }

    #[test]
    fn several_errors_get_a_count_header() {
        let rendered = render_to_string(&[
            ConfigError::Other("first".into()),
            ConfigError::Other("second".into()),
        ]);
        assert!(rendered.starts_with("2 configuration problems found"));
    }
}
