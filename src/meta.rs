//! Test-class metadata.
//!
//! Hosts without runtime reflection register each test class's declared
//! configuration up front. [`TestClassMeta`] is the static analogue of the
//! class-level annotations the original JVM integration inspected: an optional
//! custom tag list and an optional standard BDD options block.

use serde::Serialize;

/// Declared metadata for one test class.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestClassMeta {
    /// Fully qualified name of the test class.
    pub name: String,
    /// Tags from the integration's own tag attribute, if declared.
    pub tags: Option<Vec<String>>,
    /// The standard BDD options block, if declared.
    pub options: Option<BddOptions>,
}

impl TestClassMeta {
    /// Metadata for a class that declares nothing.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The standard BDD options block, mirroring `@CucumberOptions`.
///
/// Every field defaults to empty/false so partially declared blocks stay
/// cheap to construct in host registries and tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BddOptions {
    /// Tag expressions selecting scenarios.
    pub tags: Vec<String>,
    /// Regular expressions matched against scenario names.
    pub name: Vec<String>,
    /// Feature paths, possibly `classpath:`-prefixed.
    pub features: Vec<String>,
    /// Glue paths, possibly `classpath:`-prefixed.
    pub glue: Vec<String>,
    /// Formatter plugin specifications.
    pub plugin: Vec<String>,
    /// Treat undefined and pending steps as failures.
    pub strict: bool,
    /// Disable ANSI colour in console output.
    pub monochrome: bool,
    /// Skip step execution, checking wiring only.
    pub dry_run: bool,
}
