//! Feature discovery.
//!
//! Resolves the canonical, ordered list of executable features for one test
//! class. Two mutually exclusive input modes exist per invocation: a feature
//! manifest (one `path[:line:line]` entry per line) shipped across the
//! deployment boundary, or a map from logical path to the candidate URLs
//! where physical copies of that feature live. Parsing of the feature text
//! itself is delegated to the engine through [`FeatureParser`].
//!
//! Line filters accumulate monotonically across every entry processed in one
//! invocation: once any entry contributes a line filter, all subsequent parse
//! calls see the expanded set. This mirrors the upstream integration's
//! behaviour and is kept deliberately; see DESIGN.md.

use crate::filter::ScenarioFilter;
use crate::manifest::{self, ManifestError, PathWithLines};
use crate::resource::ResourceReference;
use indexmap::{IndexMap, IndexSet};
use miette::Diagnostic;
use serde::Serialize;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use url::Url;


/// Mapping of logical feature path to the physical copies backing it.
pub type FeatureMap = IndexMap<String, Vec<Url>>;

/// Errors raised during feature discovery.
#[derive(Debug, Error, Diagnostic)]
pub enum FeatureError {
    /// Discovery finished without resolving a single feature.
    #[error("no feature found")]
    #[diagnostic(
        code(cukebridge::feature::none_found),
        help("check the feature manifest, the feature home, and the class options")
    )]
    NoFeaturesFound,

    /// The feature manifest could not be read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    /// The engine rejected a feature resource.
    #[error("failed to parse feature {path}: {cause}")]
    #[diagnostic(code(cukebridge::feature::parse))]
    Parse {
        /// Logical path of the offending feature.
        path: String,
        /// The engine's diagnosis.
        cause: anyhow::Error,
    },
}

/// An engine-parsed feature, opaque beyond its reporting identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFeature {
    /// Logical path of the feature resource.
    pub path: String,
    /// Feature name as declared in its text, when the engine surfaces one.
    pub name: Option<String>,
}

/// Engine seam: turns a feature resource plus filter snapshot into a
/// [`ParsedFeature`].
pub trait FeatureParser {
    /// Parse one feature resource under the given filters.
    ///
    /// # Errors
    ///
    /// Returns the engine's own error when the resource is unreadable or its
    /// text is malformed.
    fn parse(
        &mut self,
        resource: &ResourceReference,
        filters: &[ScenarioFilter],
    ) -> anyhow::Result<ParsedFeature>;
}

/// The running filter set threaded through one discovery invocation.
///
/// Base tag/name filters keep their declared order; accumulated line filters
/// deduplicate, matching the set semantics of the upstream integration.
#[derive(Debug, Default)]
pub struct FilterSet {
    base: Vec<ScenarioFilter>,
    lines: IndexSet<u32>,
}

impl FilterSet {
    /// Start from the filters resolved off the test class.
    #[must_use]
    pub fn new(base: Vec<ScenarioFilter>) -> Self {
        Self {
            base,
            lines: IndexSet::new(),
        }
    }

    /// Fold a manifest entry's line numbers into the running set.
    pub fn accumulate_lines(&mut self, lines: &[u32]) {
        self.lines.extend(lines.iter().copied());
    }

    /// The filter list to hand to the next parse call.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ScenarioFilter> {
        self.base
            .iter()
            .cloned()
            .chain(self.lines.iter().copied().map(ScenarioFilter::Line))
            .collect()
    }
}

/// Resolve the ordered feature list for one test class.
///
/// Manifest mode runs when `feature_manifest` is `Some`; otherwise every
/// entry of `feature_map` is resolved, one parsed feature per candidate URL
/// under the same logical path.
///
/// # Errors
///
/// Returns [`FeatureError::NoFeaturesFound`] when discovery resolves zero
/// features, [`FeatureError::Manifest`] when the manifest stream is
/// unreadable, and [`FeatureError::Parse`] when the engine rejects a
/// resource. Discovery is fail-fast: the first parse failure aborts the
/// invocation.
pub fn build_feature_list(
    filters: &mut FilterSet,
    feature_manifest: Option<impl Read>,
    feature_map: &FeatureMap,
    parser: &mut dyn FeatureParser,
) -> Result<Vec<ParsedFeature>, FeatureError> {
    let mut features = Vec::new();

    if let Some(stream) = feature_manifest {
        build_from_manifest(stream, filters, parser, &mut features)?;
    } else {
        build_from_map(feature_map, filters, parser, &mut features)?;
    }

    if features.is_empty() {
        return Err(FeatureError::NoFeaturesFound);
    }

    debug!(count = features.len(), "resolved feature list");
    Ok(features)
}

fn build_from_manifest(
    stream: impl Read,
    filters: &mut FilterSet,
    parser: &mut dyn FeatureParser,
    features: &mut Vec<ParsedFeature>,
) -> Result<(), FeatureError> {
    for entry in manifest::decode(stream)? {
        let with_lines = PathWithLines::parse(&entry);
        filters.accumulate_lines(&with_lines.lines);
        let resource = ResourceReference::from_registry(with_lines.path.clone());
        features.push(parse_one(parser, &resource, filters)?);
    }
    Ok(())
}

fn build_from_map(
    feature_map: &FeatureMap,
    filters: &mut FilterSet,
    parser: &mut dyn FeatureParser,
    features: &mut Vec<ParsedFeature>,
) -> Result<(), FeatureError> {
    for (logical_path, urls) in feature_map {
        let with_lines = PathWithLines::parse(logical_path);
        filters.accumulate_lines(&with_lines.lines);
        for url in urls {
            let resource = ResourceReference::from_url(with_lines.path.clone(), url.clone());
            features.push(parse_one(parser, &resource, filters)?);
        }
    }
    Ok(())
}

fn parse_one(
    parser: &mut dyn FeatureParser,
    resource: &ResourceReference,
    filters: &FilterSet,
) -> Result<ParsedFeature, FeatureError> {
    parser
        .parse(resource, &filters.snapshot())
        .map_err(|cause| FeatureError::Parse {
            path: resource.logical_path().to_owned(),
            cause,
        })
}
