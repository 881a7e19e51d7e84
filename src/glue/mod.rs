//! Glue-class discovery.
//!
//! A glue manifest shipped across the deployment boundary is authoritative:
//! every listed class must resolve through the host's [`ClassCatalog`], and a
//! load failure aborts discovery. Without a manifest, discovery falls back to
//! the host-supplied [`GlueScanner`] (typically a client-side classpath
//! scan). Output is deduplicated by class name; order is insignificant to
//! callers but insertion order is retained for reproducible logs.

use crate::manifest::{self, ManifestError};
use crate::meta::TestClassMeta;
use indexmap::IndexMap;
use miette::Diagnostic;
use std::io::Read;
use thiserror::Error;
use tracing::debug;


/// Errors raised during glue discovery.
#[derive(Debug, Error, Diagnostic)]
pub enum GlueError {
    /// The glue manifest could not be read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    /// A class named by the manifest could not be resolved.
    #[error("failed to load glue class {name}")]
    #[diagnostic(
        code(cukebridge::glue::class_load),
        help("the glue manifest is authoritative; regenerate it if the class moved")
    )]
    ClassLoad {
        /// The unresolvable class name.
        name: String,
        /// The catalog's diagnosis.
        #[source]
        source: ClassLoadError,
    },

    /// The fallback scan failed.
    #[error("glue scan failed for {class}: {cause}")]
    #[diagnostic(code(cukebridge::glue::scan))]
    Scan {
        /// Test class whose glue was being scanned.
        class: String,
        /// The scanner's diagnosis.
        cause: anyhow::Error,
    },
}

/// A class name the active catalog does not know.
#[derive(Debug, Error)]
#[error("unknown class {name}")]
pub struct ClassLoadError {
    /// The name that failed to resolve.
    pub name: String,
}

/// Opaque handle to a resolved class.
///
/// Hosts without runtime class loading back this with a registry populated at
/// build time; the discovery logic is identical either way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassHandle {
    name: String,
}

impl ClassHandle {
    /// Wrap a resolved class name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Fully qualified name of the class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Capability to resolve fully qualified class names.
pub trait ClassCatalog: Send + Sync {
    /// Resolve a class by name.
    ///
    /// # Errors
    ///
    /// Returns [`ClassLoadError`] when the name is unknown.
    fn load_class(&self, name: &str) -> Result<ClassHandle, ClassLoadError>;
}

/// Fallback capability used when no glue manifest was shipped.
pub trait GlueScanner {
    /// Discover glue classes for the given test class.
    ///
    /// # Errors
    ///
    /// Returns the scanner's own error when discovery fails.
    fn scan(&self, meta: &TestClassMeta) -> anyhow::Result<Vec<GlueReference>>;
}

/// A resolved glue class, deduplicated by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueReference {
    /// Fully qualified class name.
    pub name: String,
    /// Resolved handle.
    pub handle: ClassHandle,
}

/// Resolve the glue classes for one test class.
///
/// # Errors
///
/// Returns [`GlueError::ClassLoad`] for any manifest entry the catalog cannot
/// resolve (fail-fast), [`GlueError::Manifest`] when the manifest stream is
/// unreadable, and [`GlueError::Scan`] when the fallback scan fails.
pub fn load_glues(
    glue_manifest: Option<impl Read>,
    catalog: &dyn ClassCatalog,
    scanner: &dyn GlueScanner,
    meta: &TestClassMeta,
) -> Result<Vec<GlueReference>, GlueError> {
    let mut glues: IndexMap<String, GlueReference> = IndexMap::new();

    if let Some(stream) = glue_manifest {
        for name in manifest::decode(stream)? {
            let handle = catalog
                .load_class(&name)
                .map_err(|source| GlueError::ClassLoad {
                    name: name.clone(),
                    source,
                })?;
            glues.entry(name.clone()).or_insert(GlueReference {
                name,
                handle,
            });
        }
    } else {
        // Client side: no manifest was shipped, scan instead.
        for glue in scanner
            .scan(meta)
            .map_err(|cause| GlueError::Scan {
                class: meta.name.clone(),
                cause,
            })?
        {
            glues.entry(glue.name.clone()).or_insert(glue);
        }
    }

    debug!(count = glues.len(), "resolved glue classes");
    Ok(glues.into_values().collect())
}
