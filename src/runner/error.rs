//! Error types for the runner module.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while driving a test class's feature run.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// The run finished with engine errors or missing step definitions.
    ///
    /// Collects everything into one aggregate so the host reports a single
    /// run-level failure instead of a per-scenario cascade.
    #[error("cucumber run failed:\n{}", .failures.join("\n"))]
    #[diagnostic(code(cukebridge::runner::failures))]
    Failures {
        /// Engine errors followed by missing-snippet entries.
        failures: Vec<String>,
    },
}
