//! Runtime options resolution.
//!
//! Exactly one configuration source is selected per test class per run,
//! never a partial merge, evaluated in this order:
//!
//! 1. the class's standard BDD options block, with `classpath:`-prefixed glue
//!    and feature paths stripped (scanning must happen on the discovery side,
//!    never at this stage);
//! 2. an explicit `options` string from the configuration properties, split
//!    on whitespace with `--strict` force-appended;
//! 3. a built-in default: strict mode, the `pretty` console formatter, and a
//!    monochrome flag derived from the `colors` property.

use crate::config::{ConfigProperties, keys};
use crate::meta::{BddOptions, TestClassMeta};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Reserved prefix marking paths that require client-side scanning.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Errors raised while resolving runtime options.
#[derive(Debug, Error, Diagnostic)]
pub enum OptionsError {
    /// A flag in the sequence is not recognised.
    #[error("unknown runtime option {flag}")]
    #[diagnostic(code(cukebridge::options::unknown_flag))]
    UnknownFlag {
        /// The offending token.
        flag: String,
    },

    /// A value-taking flag appeared without its value.
    #[error("runtime option {flag} is missing its value")]
    #[diagnostic(code(cukebridge::options::missing_value))]
    MissingValue {
        /// The flag left dangling.
        flag: String,
    },
}

/// Normalised execution options handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeOptions {
    /// Treat undefined and pending steps as failures.
    pub strict: bool,
    /// Disable ANSI colour in console output.
    pub monochrome: bool,
    /// Skip step execution, checking wiring only.
    pub dry_run: bool,
    /// Glue paths.
    pub glue: Vec<String>,
    /// Feature paths.
    pub feature_paths: Vec<String>,
    /// Formatter plugin specifications.
    pub plugins: Vec<String>,
    /// Tag expressions.
    pub tags: Vec<String>,
    /// Scenario name patterns (uncompiled).
    pub names: Vec<String>,
}

impl RuntimeOptions {
    /// Parse a flag sequence.
    ///
    /// Bare tokens are feature paths. `--plugin`, `--glue`, `--tags` and
    /// `--name` consume the following token as their value.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError`] when the sequence is structurally invalid.
    pub fn from_args<I>(args: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut options = Self::default();
        let mut tokens = args.into_iter().map(Into::into);

        while let Some(token) = tokens.next() {
            match token.as_str() {
                "--strict" => options.strict = true,
                "--no-strict" => options.strict = false,
                "--monochrome" => options.monochrome = true,
                "--no-monochrome" => options.monochrome = false,
                "--dry-run" => options.dry_run = true,
                "--plugin" | "--format" => options.plugins.push(value_of(&mut tokens, &token)?),
                "--glue" => options.glue.push(value_of(&mut tokens, &token)?),
                "--tags" => options.tags.push(value_of(&mut tokens, &token)?),
                "--name" => options.names.push(value_of(&mut tokens, &token)?),
                flag if flag.starts_with("--") => {
                    return Err(OptionsError::UnknownFlag {
                        flag: flag.to_owned(),
                    });
                }
                _ => options.feature_paths.push(token),
            }
        }

        Ok(options)
    }

    /// Build options from a class's declared options block.
    ///
    /// `classpath:`-prefixed glue and feature paths are stripped: scanning is
    /// unsupported at this stage and must be pre-resolved by the discovery
    /// side.
    #[must_use]
    pub fn from_meta(block: &BddOptions) -> Self {
        let keep = |paths: &[String]| {
            paths
                .iter()
                .filter(|path| !path.starts_with(CLASSPATH_PREFIX))
                .cloned()
                .collect()
        };
        Self {
            strict: block.strict,
            monochrome: block.monochrome,
            dry_run: block.dry_run,
            glue: keep(&block.glue),
            feature_paths: keep(&block.features),
            plugins: block.plugin.clone(),
            tags: block.tags.clone(),
            names: block.name.clone(),
        }
    }
}

fn value_of(
    tokens: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<String, OptionsError> {
    // A following flag is not a value: `--tags --strict` must not swallow
    // the strict marker as a tag expression.
    match tokens.next() {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => Err(OptionsError::MissingValue {
            flag: flag.to_owned(),
        }),
    }
}

/// Resolve runtime options for a test class.
///
/// Selection is total and exclusive: the first matching source wins and the
/// others have zero effect on the output.
///
/// # Errors
///
/// Returns [`OptionsError`] when the selected flag sequence is structurally
/// invalid.
pub fn load_runtime_options(
    meta: &TestClassMeta,
    config: &ConfigProperties,
) -> Result<RuntimeOptions, OptionsError> {
    let options = if let Some(block) = &meta.options {
        RuntimeOptions::from_meta(block)
    } else if let Some(explicit) = config.get(keys::OPTIONS) {
        let mut args: Vec<String> = explicit.split_whitespace().map(str::to_owned).collect();
        args.push("--strict".to_owned());
        RuntimeOptions::from_args(args)?
    } else {
        RuntimeOptions::from_args([
            "--strict",
            "--plugin",
            "pretty",
            monochrome_flag(config),
        ])?
    };

    debug!(class = %meta.name, options = ?options, "resolved runtime options");
    Ok(options)
}

fn monochrome_flag(config: &ConfigProperties) -> &'static str {
    if config.bool_of(keys::COLORS, false) {
        "--no-monochrome"
    } else {
        "--monochrome"
    }
}
