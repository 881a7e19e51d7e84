//! Line-oriented manifest decoding.
//!
//! Discovery results cross the client/server boundary as plain text
//! manifests: one resource path or class name per line. [`decode`] turns a
//! manifest stream into the ordered list of trimmed, non-blank entries.
//! Feature manifests additionally allow a `path:line:line` suffix selecting
//! individual scenarios; [`PathWithLines`] performs that split.
//!
//! A *missing* manifest is a valid signal (it switches discovery to its
//! fallback mode), so callers branch on stream presence before calling
//! [`decode`]; this module never models absence.

use miette::Diagnostic;
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;


/// Errors raised while decoding a manifest stream.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The underlying stream could not be read.
    #[error("failed to read manifest stream")]
    #[diagnostic(code(cukebridge::manifest::io))]
    Io(#[from] std::io::Error),
}

/// Decode a manifest into its ordered, trimmed, non-blank entries.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the stream cannot be read.
pub fn decode(reader: impl Read) -> Result<Vec<String>, ManifestError> {
    let mut entries = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        entries.push(trimmed.to_owned());
    }
    Ok(entries)
}

/// A feature-manifest entry split into its base path and scenario lines.
///
/// `a/b.feature:3:7` selects lines 3 and 7 of `a/b.feature`. The suffix is
/// only treated as line numbers when *every* colon-separated token after the
/// first parses as a positive integer; otherwise the whole entry is the path,
/// which keeps drive-letter paths such as `c:/features/x.feature` intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathWithLines {
    /// The base resource path.
    pub path: String,
    /// Selected scenario lines, empty when the whole file runs.
    pub lines: Vec<u32>,
}

impl PathWithLines {
    /// Split a manifest entry into path and line numbers.
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        let mut tokens = entry.split(':');
        let head = tokens.next().unwrap_or_default();
        let tail: Vec<&str> = tokens.collect();

        let lines: Option<Vec<u32>> = tail
            .iter()
            .map(|token| token.parse::<u32>().ok().filter(|line| *line > 0))
            .collect();

        match lines {
            Some(lines) if !tail.is_empty() => Self {
                path: head.to_owned(),
                lines,
            },
            _ => Self {
                path: entry.to_owned(),
                lines: Vec::new(),
            },
        }
    }
}
