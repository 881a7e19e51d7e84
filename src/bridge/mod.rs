//! Execution bridge.
//!
//! Decorates the engine's three invocation entry points — step execution and
//! the before/after hook batches — with a synchronous lifecycle-event
//! protocol. The bridge changes nothing about execution semantics: every
//! reporter callback is forwarded verbatim, hook delegation is unchanged, and
//! a failing event listener can never mask the engine's own outcome. Engines
//! signal step failure through [`StepReporter::result`], never through this
//! bridge's control flow.

use indexmap::IndexSet;
use itertools::Itertools;
use tracing::warn;


/// One step of a scenario, as the engine models it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Step keyword (`Given`, `When`, ...), localised per feature.
    pub keyword: String,
    /// Step text after the keyword.
    pub text: String,
    /// Line of the step in its feature file.
    pub line: u32,
}

/// The engine's match verdict for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMatch {
    /// A genuine step-definition match.
    Definition {
        /// Source location of the matched definition.
        location: String,
    },
    /// No definition matched; the engine will emit a snippet.
    Undefined,
}

/// Outcome status of a step or hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step ran and passed.
    Passed,
    /// The step ran and failed.
    Failed,
    /// The step was skipped.
    Skipped,
    /// The step is marked pending.
    Pending,
    /// No definition matched the step.
    Undefined,
}

/// Result of a step or hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Outcome status.
    pub status: StepStatus,
    /// Failure message, when the engine surfaced one.
    pub error: Option<String>,
}

/// The engine's reporting callback set, mirrored one-to-one.
///
/// The bridge interposes only on [`StepReporter::match_found`]; everything
/// else passes through unobserved.
pub trait StepReporter {
    /// A step was matched (or found undefined).
    fn match_found(&mut self, step_match: &StepMatch);
    /// A hook ran before the step.
    fn before(&mut self, step_match: &StepMatch, result: &StepResult);
    /// The step finished with this result.
    fn result(&mut self, result: &StepResult);
    /// A hook ran after the step.
    fn after(&mut self, step_match: &StepMatch, result: &StepResult);
    /// The engine attached an embedding (screenshot and the like).
    fn embedding(&mut self, mime_type: &str, data: &[u8]);
    /// The engine wrote free-form output.
    fn write(&mut self, text: &str);
}

/// Fine-grained lifecycle events emitted around engine calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A matched step is about to run.
    BeforeStep {
        /// Logical path of the feature owning the step.
        feature_path: String,
        /// The step about to run.
        step: Step,
    },
    /// A step call returned, whatever its outcome.
    AfterStep {
        /// Logical path of the feature owning the step.
        feature_path: String,
        /// The step that ran.
        step: Step,
    },
    /// The before-hook batch is about to run.
    BeforeBeforeHooks,
    /// The before-hook batch returned.
    AfterBeforeHooks,
    /// The after-hook batch is about to run.
    BeforeAfterHooks,
    /// The after-hook batch returned.
    AfterAfterHooks,
}

/// Observer of lifecycle events.
///
/// Listeners are observers, not gatekeepers: an `Err` is logged and
/// discarded, and it never alters the bracketed engine call's outcome.
pub trait EventListener: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns the listener's own error; the bus logs and discards it.
    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()>;
}

/// Synchronous, order-guaranteed fan-out to registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registration order is invocation order.
    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Fire one event at every listener, guarding each call.
    pub fn fire(&self, event: &LifecycleEvent) {
        for listener in &self.listeners {
            if let Err(error) = listener.on_event(event) {
                warn!(%error, ?event, "event listener failed, ignoring");
            }
        }
    }
}

/// The engine's invocation surface, as this crate consumes it.
pub trait ExecutionEngine {
    /// Run one step, reporting through the given reporter.
    fn run_step(
        &mut self,
        feature_path: &str,
        step: &Step,
        reporter: &mut dyn StepReporter,
        locale: &str,
    );

    /// Run the before-hook batch for a scenario with the given tags.
    fn run_before_hooks(&mut self, reporter: &mut dyn StepReporter, tags: &IndexSet<String>);

    /// Run the after-hook batch for a scenario with the given tags.
    fn run_after_hooks(&mut self, reporter: &mut dyn StepReporter, tags: &IndexSet<String>);

    /// Errors accumulated so far, in occurrence order.
    fn errors(&self) -> Vec<String>;

    /// Snippets for steps that had no matching definition.
    fn snippets(&self) -> Vec<String>;
}

impl<T: ExecutionEngine + ?Sized> ExecutionEngine for Box<T> {
    fn run_step(
        &mut self,
        feature_path: &str,
        step: &Step,
        reporter: &mut dyn StepReporter,
        locale: &str,
    ) {
        (**self).run_step(feature_path, step, reporter, locale);
    }

    fn run_before_hooks(&mut self, reporter: &mut dyn StepReporter, tags: &IndexSet<String>) {
        (**self).run_before_hooks(reporter, tags);
    }

    fn run_after_hooks(&mut self, reporter: &mut dyn StepReporter, tags: &IndexSet<String>) {
        (**self).run_after_hooks(reporter, tags);
    }

    fn errors(&self) -> Vec<String> {
        (**self).errors()
    }

    fn snippets(&self) -> Vec<String> {
        (**self).snippets()
    }
}

/// Decorator interposing lifecycle events around an engine.
pub struct ExecutionBridge<E> {
    engine: E,
    events: EventBus,
}

impl<E: ExecutionEngine> ExecutionBridge<E> {
    /// Wrap an engine with the given event bus.
    #[must_use]
    pub fn new(engine: E, events: EventBus) -> Self {
        Self { engine, events }
    }

    /// Borrow the wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Join the engine's errors into one display string.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.engine.errors().iter().join("\n")
    }
}

impl<E: ExecutionEngine> ExecutionEngine for ExecutionBridge<E> {
    fn run_step(
        &mut self,
        feature_path: &str,
        step: &Step,
        reporter: &mut dyn StepReporter,
        locale: &str,
    ) {
        let mut interposed = InterposingReporter {
            inner: reporter,
            events: &self.events,
            feature_path,
            step,
        };
        self.engine
            .run_step(feature_path, step, &mut interposed, locale);
        // Unconditional: failure reporting is the engine's concern.
        self.events.fire(&LifecycleEvent::AfterStep {
            feature_path: feature_path.to_owned(),
            step: step.clone(),
        });
    }

    fn run_before_hooks(&mut self, reporter: &mut dyn StepReporter, tags: &IndexSet<String>) {
        self.events.fire(&LifecycleEvent::BeforeBeforeHooks);
        self.engine.run_before_hooks(reporter, tags);
        self.events.fire(&LifecycleEvent::AfterBeforeHooks);
    }

    fn run_after_hooks(&mut self, reporter: &mut dyn StepReporter, tags: &IndexSet<String>) {
        self.events.fire(&LifecycleEvent::BeforeAfterHooks);
        self.engine.run_after_hooks(reporter, tags);
        self.events.fire(&LifecycleEvent::AfterAfterHooks);
    }

    fn errors(&self) -> Vec<String> {
        self.engine.errors()
    }

    fn snippets(&self) -> Vec<String> {
        self.engine.snippets()
    }
}

/// Reporter decorator firing `BeforeStep` on a genuine definition match.
struct InterposingReporter<'a> {
    inner: &'a mut dyn StepReporter,
    events: &'a EventBus,
    feature_path: &'a str,
    step: &'a Step,
}

impl StepReporter for InterposingReporter<'_> {
    fn match_found(&mut self, step_match: &StepMatch) {
        if matches!(step_match, StepMatch::Definition { .. }) {
            self.events.fire(&LifecycleEvent::BeforeStep {
                feature_path: self.feature_path.to_owned(),
                step: self.step.clone(),
            });
        }
        self.inner.match_found(step_match);
    }

    fn before(&mut self, step_match: &StepMatch, result: &StepResult) {
        self.inner.before(step_match, result);
    }

    fn result(&mut self, result: &StepResult) {
        self.inner.result(result);
    }

    fn after(&mut self, step_match: &StepMatch, result: &StepResult) {
        self.inner.after(step_match, result);
    }

    fn embedding(&mut self, mime_type: &str, data: &[u8]) {
        self.inner.embedding(mime_type, data);
    }

    fn write(&mut self, text: &str) {
        self.inner.write(text);
    }
}
