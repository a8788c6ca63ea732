//! Destroyables
//!
//! A [`Destroyable`] is an owner that teardown callbacks can be attached to.
//! Destroying it runs every registered destructor exactly once, no matter how
//! many destructors were registered or how often `destroy` is called.
//!
//! # Ordering
//!
//! 1. Associated children are destroyed first, in association order.
//! 2. The owner's own destructors then run in registration order.
//!
//! A failing destructor does not stop the ones after it. The first failure
//! is returned from [`Destroyable::destroy`]; later failures are logged.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{BoxError, DestroyError};

/// A teardown callback attached to an owner.
pub type Destructor = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Live,
    Destroying,
    Destroyed,
}

struct DestroyState {
    phase: Phase,
    destructors: Vec<Destructor>,
    children: Vec<Destroyable>,
}

/// Handle to an owner in the destroyable tree.
///
/// Cloning yields another handle to the same owner.
#[derive(Clone)]
pub struct Destroyable {
    state: Arc<Mutex<DestroyState>>,
}

impl Destroyable {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DestroyState {
                phase: Phase::Live,
                destructors: Vec::new(),
                children: Vec::new(),
            })),
        }
    }

    /// Attach a destructor that runs when this owner is destroyed.
    ///
    /// # Panics
    ///
    /// Panics if the owner is already being destroyed.
    pub fn register_destructor<F>(&self, destructor: F)
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        let mut state = self.state.lock();
        assert!(
            state.phase == Phase::Live,
            "cannot register a destructor on an owner that is being destroyed"
        );
        state.destructors.push(Box::new(destructor));
    }

    /// Destroy `child` whenever this owner is destroyed.
    ///
    /// # Panics
    ///
    /// Panics if this owner is already being destroyed.
    pub fn associate_child(&self, child: &Destroyable) {
        let mut state = self.state.lock();
        assert!(
            state.phase == Phase::Live,
            "cannot associate a child with an owner that is being destroyed"
        );
        state.children.push(child.clone());
    }

    /// Run every pending destructor, children first.
    ///
    /// Calling this more than once is a no-op after the first call.
    pub fn destroy(&self) -> Result<(), DestroyError> {
        let (children, destructors) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Live {
                return Ok(());
            }
            state.phase = Phase::Destroying;
            (
                std::mem::take(&mut state.children),
                std::mem::take(&mut state.destructors),
            )
        };
        debug!(
            children = children.len(),
            destructors = destructors.len(),
            "destroying owner"
        );

        let mut failures = Failures::default();
        for child in children {
            if let Err(err) = child.destroy() {
                failures.record(err.into());
            }
        }
        for destructor in destructors {
            if let Err(err) = destructor() {
                failures.record(err);
            }
        }

        self.state.lock().phase = Phase::Destroyed;
        failures.into_result()
    }

    /// Whether `destroy` has started (it may still be running).
    pub fn is_destroying(&self) -> bool {
        self.state.lock().phase != Phase::Live
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().phase == Phase::Destroyed
    }

    /// Number of destructors waiting to run.
    pub fn pending_destructors(&self) -> usize {
        self.state.lock().destructors.len()
    }
}

impl Default for Destroyable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Destroyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Destroyable")
            .field("phase", &state.phase)
            .field("destructors", &state.destructors.len())
            .field("children", &state.children.len())
            .finish()
    }
}

#[derive(Default)]
struct Failures {
    first: Option<BoxError>,
    count: usize,
}

impl Failures {
    fn record(&mut self, err: BoxError) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(err);
        } else {
            warn!(error = %err, "additional destructor failed");
        }
    }

    fn into_result(self) -> Result<(), DestroyError> {
        match self.first {
            None => Ok(()),
            Some(source) => Err(DestroyError {
                failures: self.count,
                source,
            }),
        }
    }
}
