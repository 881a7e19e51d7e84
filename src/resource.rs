//! Streamable resource references.
//!
//! Discovery produces [`ResourceReference`] values that pair a logical path
//! (the identity used by filters and reporting) with a physical locator: a
//! registry entry resolved through a [`ResourceLoader`], or a concrete URL
//! when the same logical feature exists in several deployment archives.

use miette::Diagnostic;
use std::fs::File;
use std::io::Read;
use thiserror::Error;
use url::Url;

/// Errors raised while resolving or opening a resource.
#[derive(Debug, Error, Diagnostic)]
pub enum ResourceError {
    /// The logical path is unknown to the resource loader.
    #[error("resource {path} doesn't exist")]
    #[diagnostic(code(cukebridge::resource::not_found))]
    NotFound {
        /// The logical path that failed to resolve.
        path: String,
    },

    /// The resource URL uses a scheme this crate cannot stream.
    #[error("unsupported URL scheme {scheme} for {url}")]
    #[diagnostic(code(cukebridge::resource::unsupported_scheme))]
    UnsupportedScheme {
        /// Scheme of the offending URL.
        scheme: String,
        /// The full URL.
        url: String,
    },

    /// The resource exists but could not be read.
    #[error("failed to open resource")]
    #[diagnostic(code(cukebridge::resource::io))]
    Io(#[from] std::io::Error),
}

/// Capability to resolve logical paths into streamable content.
///
/// The analogue of classloader resource lookup: backed by the filesystem, an
/// archive, or an in-memory registry populated at build time.
pub trait ResourceLoader: Send + Sync {
    /// Open the resource for reading.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] for unknown paths and
    /// [`ResourceError::Io`] when the content cannot be streamed.
    fn open(&self, path: &str) -> Result<Box<dyn Read>, ResourceError>;
}

/// Physical location of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocator {
    /// Resolved on demand through the active [`ResourceLoader`].
    Registry,
    /// A concrete URL, typically into an exploded deployment archive.
    Url(Url),
}

/// A logical path paired with the physical location backing it.
///
/// Identity is the logical path; the locator only says where the bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    logical_path: String,
    locator: ResourceLocator,
}

impl ResourceReference {
    /// Reference a resource resolved through the active loader.
    #[must_use]
    pub fn from_registry(logical_path: impl Into<String>) -> Self {
        Self {
            logical_path: logical_path.into(),
            locator: ResourceLocator::Registry,
        }
    }

    /// Reference a resource at a concrete URL under the given logical path.
    #[must_use]
    pub fn from_url(logical_path: impl Into<String>, url: Url) -> Self {
        Self {
            logical_path: logical_path.into(),
            locator: ResourceLocator::Url(url),
        }
    }

    /// The logical path used for filtering and reporting.
    #[must_use]
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// The physical locator backing this reference.
    #[must_use]
    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Open the resource for reading.
    ///
    /// URL-backed references currently stream `file://` URLs only; the
    /// discovery side hands over exploded archives as local files.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] when the path is unknown, the scheme is not
    /// streamable, or reading fails.
    pub fn open(&self, loader: &dyn ResourceLoader) -> Result<Box<dyn Read>, ResourceError> {
        match &self.locator {
            ResourceLocator::Registry => loader.open(&self.logical_path),
            ResourceLocator::Url(url) => open_url(url),
        }
    }
}

fn open_url(url: &Url) -> Result<Box<dyn Read>, ResourceError> {
    if url.scheme() != "file" {
        return Err(ResourceError::UnsupportedScheme {
            scheme: url.scheme().to_owned(),
            url: url.to_string(),
        });
    }
    let path = url
        .to_file_path()
        .map_err(|()| ResourceError::NotFound {
            path: url.to_string(),
        })?;
    Ok(Box::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    struct MapLoader(HashMap<String, String>);

    impl ResourceLoader for MapLoader {
        fn open(&self, path: &str) -> Result<Box<dyn Read>, ResourceError> {
            let body = self.0.get(path).ok_or_else(|| ResourceError::NotFound {
                path: path.to_owned(),
            })?;
            Ok(Box::new(std::io::Cursor::new(body.clone().into_bytes())))
        }
    }

    fn loader() -> MapLoader {
        MapLoader(HashMap::from([(
            "a/b.feature".to_owned(),
            "Feature: b".to_owned(),
        )]))
    }

    #[test]
    fn registry_reference_streams_through_loader() {
        let reference = ResourceReference::from_registry("a/b.feature");
        let mut body = String::new();
        reference
            .open(&loader())
            .expect("open")
            .read_to_string(&mut body)
            .expect("read");
        assert_eq!(body, "Feature: b");
    }

    #[test]
    fn unknown_registry_path_is_not_found() {
        let reference = ResourceReference::from_registry("missing.feature");
        let err = reference
            .open(&loader())
            .map(|_| ())
            .expect_err("should fail");
        assert!(matches!(err, ResourceError::NotFound { path } if path == "missing.feature"));
    }

    #[test]
    fn url_reference_streams_local_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "Feature: on disk").expect("write");
        let url = Url::from_file_path(file.path()).expect("file url");
        let reference = ResourceReference::from_url("a/b.feature", url);

        let mut body = String::new();
        reference
            .open(&loader())
            .expect("open")
            .read_to_string(&mut body)
            .expect("read");
        assert_eq!(body, "Feature: on disk");
        assert_eq!(reference.logical_path(), "a/b.feature");
    }

    #[test]
    fn non_file_scheme_is_rejected() {
        let url = Url::parse("https://example.invalid/x.feature").expect("url");
        let reference = ResourceReference::from_url("x.feature", url);
        let err = reference
            .open(&loader())
            .map(|_| ())
            .expect_err("should fail");
        assert!(matches!(err, ResourceError::UnsupportedScheme { scheme, .. } if scheme == "https"));
    }
}
