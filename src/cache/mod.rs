//! Lazy, epoch-scoped shared cache.
//!
//! One process runs many test classes, possibly in parallel, and some
//! metadata is expensive to discover: the set of step-keyword annotations,
//! the host's test enrichers, and its resource loaders. [`SharedCache`] holds
//! each behind its own check-lock-check slot: an uncontended read on the fast
//! path, a write lock with a re-check only while populating, so population
//! happens at most once per epoch however many threads race to first use.
//!
//! The cache's populated state is valid for exactly one lifecycle epoch (the
//! window between the host's before-class and after-class signals).
//! [`SharedCache::end_epoch`] clears every slot unconditionally; the next
//! epoch re-populates on first use, never eagerly.

use crate::glue::ClassCatalog;
use crate::resource::ResourceLoader;
use std::any::Any;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// A step-keyword annotation class, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepAnnotation(String);

impl StepAnnotation {
    /// Wrap an annotation class name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The annotation class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The five standard step keywords, used whenever discovery cannot do better.
///
/// Step-annotation discovery is a convenience and must never abort a run.
#[must_use]
pub fn default_step_annotations() -> Vec<StepAnnotation> {
    ["Given", "When", "Then", "And", "But"]
        .into_iter()
        .map(StepAnnotation::new)
        .collect()
}

/// Host capability to enrich a test instance (inject dependencies and the
/// like) before its scenarios run.
pub trait TestEnricher: Send + Sync {
    /// Enrich one instance.
    ///
    /// # Errors
    ///
    /// Returns the enricher's own error; callers isolate it per enricher.
    fn enrich(&self, instance: &mut dyn Any) -> anyhow::Result<()>;
}

/// Host-side service discovery, queried lazily per slot.
pub trait ServiceLocator: Send + Sync {
    /// Discover descendants of the step-keyword marker annotation.
    ///
    /// # Errors
    ///
    /// Returns the locator's own error; callers fall back to
    /// [`default_step_annotations`].
    fn step_annotations(&self) -> anyhow::Result<Vec<StepAnnotation>>;

    /// Discover the host's test enrichers.
    fn test_enrichers(&self) -> Vec<Arc<dyn TestEnricher>>;

    /// Discover the host's resource loaders.
    fn resource_loaders(&self) -> Vec<Arc<dyn ResourceLoader>>;
}

type Slot<T> = RwLock<Option<Vec<T>>>;

/// Process-wide cache of expensive-to-discover host metadata.
///
/// This is the only shared mutable state in the crate. It is an explicit
/// owned object passed to the components that need it, with an explicit
/// lifecycle, not implicit static state.
#[derive(Default)]
pub struct SharedCache {
    annotations: Slot<StepAnnotation>,
    enrichers: Slot<Arc<dyn TestEnricher>>,
    loaders: Slot<Arc<dyn ResourceLoader>>,
}

impl SharedCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch start. Population stays lazy; this only marks the boundary.
    pub fn begin_epoch(&self) {
        debug!("lifecycle epoch started");
    }

    /// Epoch end: clear every slot, populated or not.
    pub fn end_epoch(&self) {
        self.clear();
    }

    /// Unconditionally empty all three slots.
    pub fn clear(&self) {
        *write(&self.annotations) = None;
        *write(&self.enrichers) = None;
        *write(&self.loaders) = None;
        debug!("shared cache cleared");
    }

    /// Seed the annotation slot from the optional annotation manifest.
    ///
    /// Manifest problems are swallowed here: a missing or unreadable manifest
    /// and unresolvable entries only reduce what gets seeded. Discovery of
    /// step annotations must never abort a run.
    pub fn seed_annotations_from_manifest(
        &self,
        manifest: Option<impl Read>,
        catalog: &dyn ClassCatalog,
    ) {
        let Some(stream) = manifest else {
            return;
        };
        if read(&self.annotations).is_some() {
            return;
        }
        let mut slot = write(&self.annotations);
        if slot.is_some() {
            return;
        }

        let entries = match crate::manifest::decode(stream) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "unreadable annotation manifest, skipping seed");
                return;
            }
        };
        let mut annotations = Vec::new();
        for name in entries {
            match catalog.load_class(&name) {
                Ok(handle) => annotations.push(StepAnnotation::new(handle.name())),
                Err(error) => debug!(%error, "skipping unresolvable annotation class"),
            }
        }
        // A manifest with no resolvable entries leaves the slot empty so the
        // getter can still fall back to the standard keywords.
        if !annotations.is_empty() {
            *slot = Some(annotations);
        }
    }

    /// The step-keyword annotations for this epoch.
    ///
    /// Populates the slot through the locator on first use. A locator failure
    /// or an empty discovery falls back to [`default_step_annotations`]
    /// without caching, so a later call may still discover the real set.
    pub fn step_annotations(&self, locator: &dyn ServiceLocator) -> Vec<StepAnnotation> {
        if let Some(cached) = read(&self.annotations).as_ref() {
            return cached.clone();
        }

        let mut slot = write(&self.annotations);
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }

        match locator.step_annotations() {
            Ok(found) if !found.is_empty() => {
                *slot = Some(found.clone());
                found
            }
            Ok(_) => default_step_annotations(),
            Err(error) => {
                warn!(%error, "step annotation discovery failed, using defaults");
                default_step_annotations()
            }
        }
    }

    /// Populate the enricher and resource-loader slots if still empty.
    ///
    /// Called on the host's before-each signal so the active context is
    /// already established when discovery runs.
    pub fn warm(&self, locator: &dyn ServiceLocator) {
        populate_if_empty(&self.enrichers, || locator.test_enrichers());
        populate_if_empty(&self.loaders, || locator.resource_loaders());
    }

    /// Enrich a test instance with every cached enricher.
    ///
    /// A failing enricher is logged and skipped: one enricher must not make
    /// all enrichment fail.
    pub fn enrich(&self, instance: &mut dyn Any) {
        let enrichers = read(&self.enrichers).clone().unwrap_or_default();
        for enricher in enrichers {
            if let Err(error) = enricher.enrich(instance) {
                warn!(%error, "enricher failed, continuing with the rest");
            }
        }
    }

    /// The cached resource loaders, or empty when never populated.
    #[must_use]
    pub fn resource_loaders(&self) -> Vec<Arc<dyn ResourceLoader>> {
        read(&self.loaders).clone().unwrap_or_default()
    }
}

fn populate_if_empty<T>(slot: &Slot<T>, discover: impl FnOnce() -> Vec<T>) {
    if read(slot).is_some() {
        return;
    }
    let mut guard = write(slot);
    if guard.is_none() {
        *guard = Some(discover());
    }
}

fn read<T>(slot: &Slot<T>) -> std::sync::RwLockReadGuard<'_, Option<Vec<T>>> {
    slot.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(slot: &Slot<T>) -> std::sync::RwLockWriteGuard<'_, Option<Vec<T>>> {
    slot.write().unwrap_or_else(PoisonError::into_inner)
}
