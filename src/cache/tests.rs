//! Tests for the lazy shared cache.

use super::*;
use crate::glue::{ClassHandle, ClassLoadError};
use anyhow::anyhow;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};
use tracing::Level;
use tracing_subscriber::fmt;

#[derive(Clone)]
struct BufferWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for BufferWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().expect("lock").write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buf.lock().expect("lock").flush()
    }
}

/// Capture logs emitted within the provided closure.
fn capture_logs<F>(level: Level, f: F) -> String
where
    F: FnOnce(),
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let writer = BufferWriter {
        buf: Arc::clone(&buf),
    };
    let subscriber = fmt()
        .with_max_level(level)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let locked = buf.lock().expect("lock");
    String::from_utf8(locked.clone()).expect("utf8")
}

struct CountingLocator {
    annotation_calls: AtomicUsize,
    enricher_calls: AtomicUsize,
    loader_calls: AtomicUsize,
    fail_annotations: bool,
}

impl CountingLocator {
    fn new(fail_annotations: bool) -> Self {
        Self {
            annotation_calls: AtomicUsize::new(0),
            enricher_calls: AtomicUsize::new(0),
            loader_calls: AtomicUsize::new(0),
            fail_annotations,
        }
    }
}

impl ServiceLocator for CountingLocator {
    fn step_annotations(&self) -> anyhow::Result<Vec<StepAnnotation>> {
        self.annotation_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_annotations {
            Err(anyhow!("service discovery broken"))
        } else {
            Ok(vec![StepAnnotation::new("Given"), StepAnnotation::new("Soit")])
        }
    }

    fn test_enrichers(&self) -> Vec<Arc<dyn TestEnricher>> {
        self.enricher_calls.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    }

    fn resource_loaders(&self) -> Vec<Arc<dyn ResourceLoader>> {
        self.loader_calls.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    }
}

struct AllowAllCatalog;

impl ClassCatalog for AllowAllCatalog {
    fn load_class(&self, name: &str) -> Result<ClassHandle, ClassLoadError> {
        if name.contains("Gone") {
            Err(ClassLoadError {
                name: name.to_owned(),
            })
        } else {
            Ok(ClassHandle::new(name))
        }
    }
}

struct RecordingEnricher {
    calls: AtomicUsize,
    fail: bool,
}

impl TestEnricher for RecordingEnricher {
    fn enrich(&self, _instance: &mut dyn Any) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("injection failed"))
        } else {
            Ok(())
        }
    }
}

#[test]
fn concurrent_first_touch_populates_each_slot_once() {
    let cache = Arc::new(SharedCache::new());
    let locator = Arc::new(CountingLocator::new(false));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let locator = Arc::clone(&locator);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                cache.warm(locator.as_ref());
                cache.step_annotations(locator.as_ref())
            })
        })
        .collect();

    for handle in handles {
        let annotations = handle.join().expect("thread");
        assert_eq!(annotations.len(), 2);
    }

    assert_eq!(locator.annotation_calls.load(Ordering::SeqCst), 1);
    assert_eq!(locator.enricher_calls.load(Ordering::SeqCst), 1);
    assert_eq!(locator.loader_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn clear_forces_repopulation_next_epoch() {
    let cache = SharedCache::new();
    let locator = CountingLocator::new(false);

    cache.step_annotations(&locator);
    cache.end_epoch();
    cache.begin_epoch();
    cache.step_annotations(&locator);

    assert_eq!(locator.annotation_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn locator_failure_falls_back_to_defaults_without_caching() {
    let cache = SharedCache::new();
    let locator = CountingLocator::new(true);

    let first = cache.step_annotations(&locator);
    let second = cache.step_annotations(&locator);

    assert_eq!(first, default_step_annotations());
    assert_eq!(second, default_step_annotations());
    // The failure was not cached: the locator was asked again.
    assert_eq!(locator.annotation_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn manifest_seed_skips_unresolvable_entries() {
    let cache = SharedCache::new();
    let manifest = "steps.Given\nsteps.Gone\nsteps.When\n";

    cache.seed_annotations_from_manifest(Some(manifest.as_bytes()), &AllowAllCatalog);

    let locator = CountingLocator::new(false);
    let annotations = cache.step_annotations(&locator);
    assert_eq!(
        annotations,
        vec![StepAnnotation::new("steps.Given"), StepAnnotation::new("steps.When")]
    );
    // Seeded slot means the locator is never consulted.
    assert_eq!(locator.annotation_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn manifest_with_no_resolvable_entries_leaves_defaults_reachable() {
    let cache = SharedCache::new();
    let manifest = "steps.Gone\nother.Gone\n";

    cache.seed_annotations_from_manifest(Some(manifest.as_bytes()), &AllowAllCatalog);

    let locator = CountingLocator::new(true);
    let annotations = cache.step_annotations(&locator);
    assert_eq!(annotations, default_step_annotations());
}

#[test]
fn absent_annotation_manifest_is_a_valid_signal() {
    let cache = SharedCache::new();
    cache.seed_annotations_from_manifest(None::<&[u8]>, &AllowAllCatalog);

    let locator = CountingLocator::new(false);
    cache.step_annotations(&locator);
    assert_eq!(locator.annotation_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn one_failing_enricher_does_not_stop_the_rest() {
    struct SingleLocator(Vec<Arc<dyn TestEnricher>>);
    impl ServiceLocator for SingleLocator {
        fn step_annotations(&self) -> anyhow::Result<Vec<StepAnnotation>> {
            Ok(Vec::new())
        }
        fn test_enrichers(&self) -> Vec<Arc<dyn TestEnricher>> {
            self.0.clone()
        }
        fn resource_loaders(&self) -> Vec<Arc<dyn ResourceLoader>> {
            Vec::new()
        }
    }

    let failing = Arc::new(RecordingEnricher {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let healthy = Arc::new(RecordingEnricher {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let locator = SingleLocator(vec![failing.clone(), healthy.clone()]);

    let cache = SharedCache::new();
    cache.warm(&locator);

    let mut instance: Box<dyn Any> = Box::new(());
    let output = capture_logs(Level::WARN, || cache.enrich(instance.as_mut()));

    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    assert!(output.contains("enricher failed"));
}
