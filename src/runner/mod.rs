//! Test-class run orchestration.
//!
//! Glues the discovery pieces together for one test class: load the shipped
//! configuration (or fall back to the caller's), resolve filters, features,
//! options, and glue classes, build the engine through the host's factory,
//! wrap it in the event-emitting [`ExecutionBridge`], drive every feature
//! through the host's [`FeatureDriver`], persist the JSON report when asked
//! to, and fold engine errors plus missing snippets into one aggregate
//! failure.

mod error;

pub use error::RunError;

use crate::bridge::{EventBus, ExecutionBridge, ExecutionEngine, StepMatch, StepReporter, StepResult};
use crate::config::{ConfigProperties, keys};
use crate::feature::{FeatureMap, FeatureParser, FilterSet, ParsedFeature, build_feature_list};
use crate::filter::create_filters;
use crate::glue::{ClassCatalog, GlueReference, GlueScanner, load_glues};
use crate::meta::TestClassMeta;
use crate::options::{RuntimeOptions, load_runtime_options};
use crate::report::JsonReport;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Read;
use tracing::{debug, info};


/// Host capability to build an engine for a resolved glue and options set.
pub trait EngineFactory {
    /// Create the engine that will execute this class's scenarios.
    fn create(&self, glues: &[GlueReference], options: &RuntimeOptions)
    -> Box<dyn ExecutionEngine>;
}

/// Host capability to drive one parsed feature through an engine.
///
/// The host owns scenario sequencing and its own reporting; this crate only
/// hands it the bridge-wrapped engine so step and hook calls emit events.
pub trait FeatureDriver {
    /// Run one feature to completion.
    ///
    /// # Errors
    ///
    /// Returns the host's own error when the feature cannot be driven at all;
    /// ordinary step failures are reported through the engine instead.
    fn run_feature(
        &mut self,
        feature: &ParsedFeature,
        engine: &mut dyn ExecutionEngine,
        reporter: &mut dyn StepReporter,
    ) -> Result<()>;
}

/// Host capability to build the map-mode feature input.
///
/// Consulted only when no feature manifest was shipped. Receives the
/// configured feature home, when one is set, so discovery can root relative
/// feature paths there.
pub trait FeatureMapSource {
    /// Build the logical-path to candidate-URL map.
    fn feature_map(&self, feature_home: Option<&str>) -> FeatureMap;
}

/// The optional manifests and fallback inputs for one run.
///
/// Each manifest is `Some` when the discovery side shipped one; absence is a
/// valid signal selecting the corresponding fallback.
pub struct RunResources {
    /// Configuration properties manifest.
    pub config_manifest: Option<Box<dyn Read>>,
    /// Feature manifest (`path[:line:line]` per line).
    pub feature_manifest: Option<Box<dyn Read>>,
    /// Glue manifest (one class name per line).
    pub glue_manifest: Option<Box<dyn Read>>,
    /// Configuration used when no configuration manifest was shipped.
    pub fallback_config: ConfigProperties,
}

/// The host-supplied collaborator set for one run.
pub struct Collaborators<'a> {
    /// Engine seam parsing feature resources.
    pub parser: &'a mut dyn FeatureParser,
    /// Class resolution for glue manifests.
    pub catalog: &'a dyn ClassCatalog,
    /// Fallback glue discovery.
    pub scanner: &'a dyn GlueScanner,
    /// Engine construction.
    pub factory: &'a dyn EngineFactory,
    /// Feature sequencing.
    pub driver: &'a mut dyn FeatureDriver,
    /// Map-mode feature discovery.
    pub feature_source: &'a dyn FeatureMapSource,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// The features that ran, in execution order.
    pub features: Vec<ParsedFeature>,
    /// Where the JSON report was written, when reporting was enabled.
    pub report_path: Option<Utf8PathBuf>,
}

/// Run one test class end to end.
///
/// # Errors
///
/// Discovery failures (features, glue, options, configuration) abort before
/// anything executes and surface as run-level errors. After execution,
/// engine errors and missing snippets are folded into [`RunError::Failures`].
pub fn run_test_class(
    meta: &TestClassMeta,
    resources: RunResources,
    collaborators: Collaborators<'_>,
    reporter: &mut dyn StepReporter,
    events: EventBus,
) -> Result<RunSummary> {
    let Collaborators {
        parser,
        catalog,
        scanner,
        factory,
        driver,
        feature_source,
    } = collaborators;

    let config = match resources.config_manifest {
        Some(stream) => {
            ConfigProperties::decode(stream).context("loading shipped configuration")?
        }
        None => resources.fallback_config,
    };

    let feature_map = if resources.feature_manifest.is_some() {
        FeatureMap::new()
    } else {
        feature_source.feature_map(config.get(keys::FEATURE_HOME))
    };

    let mut filters = FilterSet::new(create_filters(meta)?);
    let features = build_feature_list(
        &mut filters,
        resources.feature_manifest,
        &feature_map,
        parser,
    )
    .with_context(|| format!("discovering features for {}", meta.name))?;

    let options = load_runtime_options(meta, &config)?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let dump = serde_json::to_string_pretty(&options).context("serialising options")?;
        debug!("runtime options:\n{dump}");
    }

    let glues = load_glues(resources.glue_manifest, catalog, scanner, meta)
        .with_context(|| format!("loading glue for {}", meta.name))?;

    let engine = factory.create(&glues, &options);
    let mut bridge = ExecutionBridge::new(engine, events);

    let reported = config.bool_of(keys::REPORTABLE, false);
    let mut json_report = reported.then(JsonReport::new);

    for feature in &features {
        info!(path = %feature.path, "running feature");
        match json_report.as_mut() {
            Some(report) => {
                let mut tee = TeeReporter {
                    primary: &mut *reporter,
                    report,
                };
                driver.run_feature(feature, &mut bridge, &mut tee)?;
            }
            None => driver.run_feature(feature, &mut bridge, reporter)?,
        }
    }

    let report_path = match (json_report, config.get(keys::REPORTABLE_PATH)) {
        (Some(report), Some(dir)) => Some(crate::report::write_report(
            Utf8Path::new(dir),
            &meta.name,
            &report.to_json(),
        )?),
        _ => None,
    };

    let mut failures = bridge.errors();
    failures.extend(
        bridge
            .snippets()
            .into_iter()
            .map(|snippet| format!("Missing snippet: {snippet}")),
    );
    if !failures.is_empty() {
        return Err(RunError::Failures { failures }.into());
    }

    Ok(RunSummary {
        features,
        report_path,
    })
}

/// Fans every callback out to the primary reporter and the JSON report.
struct TeeReporter<'a> {
    primary: &'a mut dyn StepReporter,
    report: &'a mut JsonReport,
}

impl StepReporter for TeeReporter<'_> {
    fn match_found(&mut self, step_match: &StepMatch) {
        self.primary.match_found(step_match);
        self.report.match_found(step_match);
    }

    fn before(&mut self, step_match: &StepMatch, result: &StepResult) {
        self.primary.before(step_match, result);
        self.report.before(step_match, result);
    }

    fn result(&mut self, result: &StepResult) {
        self.primary.result(result);
        self.report.result(result);
    }

    fn after(&mut self, step_match: &StepMatch, result: &StepResult) {
        self.primary.after(step_match, result);
        self.report.after(step_match, result);
    }

    fn embedding(&mut self, mime_type: &str, data: &[u8]) {
        self.primary.embedding(mime_type, data);
        self.report.embedding(mime_type, data);
    }

    fn write(&mut self, text: &str) {
        self.primary.write(text);
        self.report.write(text);
    }
}
