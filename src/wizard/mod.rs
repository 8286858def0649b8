//! Step-wizard engine: an ordered list of pages with gated, asynchronous
//! forward navigation.
//!
//! The engine owns only the cursor. Rendering, key handling and any state
//! the steps close over belong to the hosting application; after each
//! successful transition the host re-invokes `current().render()` to get
//! the next view.

use std::cell::Cell;

use futures_util::future::BoxFuture;
use thiserror::Error;

#[cfg(test)]
mod tests;

type RenderFn<V> = Box<dyn Fn() -> V>;
type GateFn = Box<dyn Fn() -> bool>;
type PreNextFn = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>>>;

/// One page of a wizard: a title, a render callback, and optional
/// gate / pre-transition hooks.
///
/// An absent gate means the step can always be left forward; an absent
/// pre-transition hook means advancing commits immediately.
pub struct Step<V> {
    title: String,
    render: RenderFn<V>,
    can_go_next: Option<GateFn>,
    pre_next: Option<PreNextFn>,
}

impl<V> Step<V> {
    pub fn new(title: impl Into<String>, render: impl Fn() -> V + 'static) -> Self {
        let title = title.into();
        debug_assert!(!title.is_empty(), "step title must be non-empty");
        Self {
            title,
            render: Box::new(render),
            can_go_next: None,
            pre_next: None,
        }
    }

    /// Attach a predicate deciding whether forward navigation is allowed.
    pub fn gated(mut self, gate: impl Fn() -> bool + 'static) -> Self {
        self.can_go_next = Some(Box::new(gate));
        self
    }

    /// Attach an asynchronous action that must succeed before the wizard
    /// moves past this step.
    pub fn before_next<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.pre_next = Some(Box::new(move || Box::pin(hook())));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Produce the view for this step.
    pub fn render(&self) -> V {
        (self.render)()
    }

    fn gate_open(&self) -> bool {
        self.can_go_next.as_ref().map_or(true, |gate| gate())
    }
}

/// Failures reported by [`StepWizard::advance`]. All are recoverable: the
/// cursor is unchanged and the wizard remains usable.
#[derive(Debug, Error)]
pub enum WizardError {
    /// The current step's gate refused forward navigation.
    #[error("step \"{0}\" is not ready to continue")]
    GateBlocked(String),

    /// The current step's pre-transition hook failed.
    #[error("leaving step \"{step}\" failed: {cause}")]
    PreNextFailed {
        step: String,
        cause: anyhow::Error,
    },

    /// A previous `advance` has not resolved yet.
    #[error("another advance is still in progress")]
    AdvanceInProgress,
}

/// Sequences through an ordered, non-empty list of [`Step`]s.
///
/// `advance` is the only suspending operation and must not be overlapped;
/// a second call while one is pending fails fast with
/// [`WizardError::AdvanceInProgress`]. The cursor lives in `Cell`s so the
/// wizard is shared-reference friendly inside a single-threaded UI loop
/// (and deliberately `!Sync`).
pub struct StepWizard<V> {
    steps: Vec<Step<V>>,
    index: Cell<usize>,
    advancing: Cell<bool>,
}

impl<V> StepWizard<V> {
    /// Create a wizard positioned on the first step.
    ///
    /// # Panics
    /// Panics if `steps` is empty; a wizard without pages is a
    /// construction bug, not a runtime condition.
    pub fn new(steps: Vec<Step<V>>) -> Self {
        assert!(!steps.is_empty(), "a wizard needs at least one step");
        Self {
            steps,
            index: Cell::new(0),
            advancing: Cell::new(false),
        }
    }

    pub fn current(&self) -> &Step<V> {
        &self.steps[self.index.get()]
    }

    pub fn index(&self) -> usize {
        self.index.get()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.index.get() + 1 == self.steps.len()
    }

    /// Titles of all steps in order, for progress headers.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.title.as_str())
    }

    /// Whether the current step's gate permits forward navigation.
    pub fn can_advance(&self) -> bool {
        self.current().gate_open()
    }

    /// Move forward one step.
    ///
    /// Checks, in order: no advance already in flight, the gate, then the
    /// pre-transition hook. Any failure leaves the cursor untouched. On
    /// the last step a successful advance is a no-op.
    pub async fn advance(&self) -> Result<(), WizardError> {
        if self.advancing.get() {
            return Err(WizardError::AdvanceInProgress);
        }

        let step = self.current();
        if !step.gate_open() {
            return Err(WizardError::GateBlocked(step.title.clone()));
        }

        if let Some(hook) = &step.pre_next {
            self.advancing.set(true);
            let outcome = hook().await;
            self.advancing.set(false);
            if let Err(cause) = outcome {
                return Err(WizardError::PreNextFailed {
                    step: step.title.clone(),
                    cause,
                });
            }
        }

        let i = self.index.get();
        if i + 1 < self.steps.len() {
            self.index.set(i + 1);
        }
        Ok(())
    }

    /// Move back one step. Synchronous, never fails, never re-validates
    /// gates; a no-op on the first step.
    pub fn retreat(&self) {
        let i = self.index.get();
        if i > 0 {
            self.index.set(i - 1);
        }
    }
}
