//! Scenario filter resolution.
//!
//! Inspects a test class's declared metadata and produces the ordered filter
//! list handed to the execution engine: tags from the integration's own tag
//! attribute first, then tags from the standard options block, then its name
//! patterns compiled to regexes. Sources are never deduplicated against each
//! other; downstream evaluation is predicate based, so duplicates are
//! harmless. Filter *evaluation* belongs to the engine, not this crate.

use crate::meta::TestClassMeta;
use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

/// Errors raised while resolving filters.
#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    /// A declared name pattern is not a valid regular expression.
    #[error("invalid scenario name pattern {pattern:?}")]
    #[diagnostic(code(cukebridge::filter::bad_pattern))]
    Pattern {
        /// The offending pattern text.
        pattern: String,
        /// The regex compiler's diagnosis.
        #[source]
        source: regex::Error,
    },
}

/// One scenario selection criterion.
#[derive(Debug, Clone)]
pub enum ScenarioFilter {
    /// Include scenarios carrying the tag (or tag expression).
    Tag(String),
    /// Include scenarios whose name matches the pattern.
    Name(Regex),
    /// Include the scenario at this line of its feature file.
    Line(u32),
}

impl PartialEq for ScenarioFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (Self::Name(a), Self::Name(b)) => a.as_str() == b.as_str(),
            (Self::Line(a), Self::Line(b)) => a == b,
            _ => false,
        }
    }
}

/// Resolve the ordered filter list for a test class.
///
/// Returns an empty list when the class declares neither the custom tag
/// attribute nor the standard options block, meaning "no restriction".
///
/// # Errors
///
/// Returns [`FilterError::Pattern`] when a declared name pattern fails to
/// compile.
pub fn create_filters(meta: &TestClassMeta) -> Result<Vec<ScenarioFilter>, FilterError> {
    let mut filters = Vec::new();

    if let Some(tags) = &meta.tags {
        filters.extend(tags.iter().cloned().map(ScenarioFilter::Tag));
    }

    if let Some(options) = &meta.options {
        filters.extend(options.tags.iter().cloned().map(ScenarioFilter::Tag));
        for pattern in &options.name {
            let regex = Regex::new(pattern).map_err(|source| FilterError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            filters.push(ScenarioFilter::Name(regex));
        }
    }

    Ok(filters)
}
