//! Cukebridge core library.
//!
//! Bridges a Cucumber-style feature/step engine with a test-execution host
//! that owns class lifecycle, deployment, and reporting. The crate discovers
//! test artefacts shipped across a client/server boundary as line-oriented
//! manifests, resolves runtime options from exactly one configuration source,
//! wraps the engine's step and hook entry points in a lifecycle-event
//! protocol, and keeps expensive host metadata in an epoch-scoped lazy cache.
//!
//! The engine itself, the host's lifecycle container, and its scenario
//! sequencing stay external collaborators behind the traits in [`bridge`],
//! [`feature`], [`glue`], [`cache`], and [`runner`].

pub mod bridge;
pub mod cache;
pub mod config;
pub mod feature;
pub mod filter;
pub mod glue;
pub mod manifest;
pub mod meta;
pub mod options;
pub mod report;
pub mod resource;
pub mod runner;
