//! JSON report accumulation and best-effort persistence.
//!
//! When the `report` configuration flag is set, a [`JsonReport`] rides along
//! as an extra reporter, accumulating one JSON entry per step. After the run
//! the accumulated document is written to `<reportDirectory>/<Class>.json`.
//! Failing to create the report directory is a hard error; a failing write of
//! the report itself is logged and otherwise ignored, so report trouble never
//! fails an otherwise green run.

use crate::bridge::{StepMatch, StepReporter, StepResult, StepStatus};
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

/// Errors raised while persisting a report.
#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    /// The report directory could not be created.
    #[error("can't create report directory {dir}")]
    #[diagnostic(code(cukebridge::report::create_dir))]
    CreateDir {
        /// The directory that could not be created.
        dir: Utf8PathBuf,
        /// The filesystem's diagnosis.
        #[source]
        source: std::io::Error,
    },
}

/// Reporter accumulating a JSON document of step outcomes.
#[derive(Debug, Default)]
pub struct JsonReport {
    entries: Vec<Value>,
    pending_match: Option<StepMatch>,
}

impl JsonReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated document.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.entries.clone())
    }

    fn status_label(status: StepStatus) -> &'static str {
        match status {
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::Pending => "pending",
            StepStatus::Undefined => "undefined",
        }
    }
}

impl StepReporter for JsonReport {
    fn match_found(&mut self, step_match: &StepMatch) {
        self.pending_match = Some(step_match.clone());
    }

    fn before(&mut self, _step_match: &StepMatch, _result: &StepResult) {}

    fn result(&mut self, result: &StepResult) {
        let location = match self.pending_match.take() {
            Some(StepMatch::Definition { location }) => Value::String(location),
            Some(StepMatch::Undefined) | None => Value::Null,
        };
        self.entries.push(json!({
            "match": location,
            "status": Self::status_label(result.status),
            "error": result.error,
        }));
    }

    fn after(&mut self, _step_match: &StepMatch, _result: &StepResult) {}

    fn embedding(&mut self, _mime_type: &str, _data: &[u8]) {}

    fn write(&mut self, _text: &str) {}
}

/// Destination file for a class's report.
#[must_use]
pub fn report_file(dir: &Utf8Path, class_name: &str) -> Utf8PathBuf {
    dir.join(format!("{class_name}.json"))
}

/// Write a report document under the given directory.
///
/// The write itself is best-effort: an I/O failure is logged and the
/// destination path still returned. This mirrors the upstream integration
/// and is flagged in DESIGN.md as a defect worth revisiting.
///
/// # Errors
///
/// Returns [`ReportError::CreateDir`] when the report directory cannot be
/// created.
pub fn write_report(
    dir: &Utf8Path,
    class_name: &str,
    document: &Value,
) -> Result<Utf8PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        dir: dir.to_owned(),
        source,
    })?;
    let destination = report_file(dir, class_name);
    let body = document.to_string();
    if let Err(error) = std::fs::write(&destination, body) {
        warn!(%error, path = %destination, "failed to write report, continuing");
    }
    Ok(destination)
}
