//! Configuration-properties handling.
//!
//! The host ships run configuration as a line-oriented key/value resource
//! (java-properties style). [`ConfigProperties`] wraps the decoded map behind
//! typed accessors so the rest of the crate never touches raw strings for the
//! recognised keys listed in [`keys`].

use indexmap::IndexMap;
use miette::Diagnostic;
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;

/// Recognised configuration keys.
pub mod keys {
    /// Root directory holding feature files on the discovery side.
    pub const FEATURE_HOME: &str = "featureHome";
    /// Explicit runtime-options string, split on whitespace when present.
    pub const OPTIONS: &str = "options";
    /// Whether a JSON report should be accumulated and written.
    pub const REPORTABLE: &str = "report";
    /// Directory receiving per-class JSON report files.
    pub const REPORTABLE_PATH: &str = "reportDirectory";
    /// Whether coloured output is available to the console formatter.
    pub const COLORS: &str = "colors";
}

/// Errors raised while decoding a configuration stream.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The underlying stream could not be read.
    #[error("failed to read configuration stream")]
    #[diagnostic(code(cukebridge::config::io))]
    Io(#[from] std::io::Error),
}

/// Ordered key/value configuration source.
///
/// Later assignments to the same key overwrite earlier ones, matching
/// `java.util.Properties` load semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigProperties(IndexMap<String, String>);

impl ConfigProperties {
    /// Create an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode properties from a readable stream.
    ///
    /// Accepts the java-properties subset the host actually emits: trimmed
    /// lines, blank lines and `#`/`!` comments skipped, the first `=` or `:`
    /// separating key from value. A line without a separator is a key with an
    /// empty value. Backslash escapes and line continuations are not handled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the stream cannot be read.
    pub fn decode(reader: impl Read) -> Result<Self, ConfigError> {
        let mut map = IndexMap::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(at) => {
                    let (k, v) = line.split_at(at);
                    (k, &v[1..])
                }
                None => (line, ""),
            };
            map.insert(key.trim().to_owned(), value.trim().to_owned());
        }
        Ok(Self(map))
    }

    /// Look up a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the key is present at all, regardless of its value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Interpret a key as a boolean flag, falling back to `default` when the
    /// key is absent. Anything other than (case-insensitive) `true` is false.
    #[must_use]
    pub fn bool_of(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map_or(default, |value| value.eq_ignore_ascii_case("true"))
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("colors=true", "colors", Some("true"))]
    #[case("colors: true", "colors", Some("true"))]
    #[case("  report = false  ", "report", Some("false"))]
    #[case("featureHome=/srv/features", "featureHome", Some("/srv/features"))]
    #[case("standalone", "standalone", Some(""))]
    fn decode_parses_separators(
        #[case] input: &str,
        #[case] key: &str,
        #[case] expected: Option<&str>,
    ) {
        let props = ConfigProperties::decode(input.as_bytes()).expect("decode");
        assert_eq!(props.get(key), expected);
    }

    #[test]
    fn decode_skips_blanks_and_comments() {
        let input = "\n# a comment\n! another\noptions=--tags @wip\n\n";
        let props = ConfigProperties::decode(input.as_bytes()).expect("decode");
        assert_eq!(props.get(keys::OPTIONS), Some("--tags @wip"));
        assert!(!props.contains("# a comment"));
    }

    #[test]
    fn later_assignment_wins() {
        let input = "colors=false\ncolors=true\n";
        let props = ConfigProperties::decode(input.as_bytes()).expect("decode");
        assert_eq!(props.get(keys::COLORS), Some("true"));
    }

    #[rstest]
    #[case(None, false, false)]
    #[case(None, true, true)]
    #[case(Some("true"), false, true)]
    #[case(Some("TRUE"), false, true)]
    #[case(Some("yes"), true, false)]
    fn bool_of_handles_absence_and_junk(
        #[case] value: Option<&str>,
        #[case] default: bool,
        #[case] expected: bool,
    ) {
        let mut props = ConfigProperties::new();
        if let Some(value) = value {
            props.set(keys::COLORS, value);
        }
        assert_eq!(props.bool_of(keys::COLORS, default), expected);
    }
}
