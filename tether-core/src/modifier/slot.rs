//! Effect slots.
//!
//! An [`EffectSlot`] is one `on.sync` declaration. It wraps the user callback
//! in a [`Memo`], so the callback re-runs exactly when something it read
//! changed, and keeps the teardown returned by the previous run.
//!
//! # Run Protocol
//!
//! Every time the slot's memo recomputes:
//!
//! 1. The pending teardown from the previous run (if any) is taken and run,
//!    outside of dependency tracking.
//!
//! 2. The callback runs with the host resource and the argument view; every
//!    read it performs becomes a dependency of the slot.
//!
//! 3. The teardown it returns (if any) becomes the new pending teardown.
//!
//! When the slot is created it also registers a destructor on the owning
//! [`Destroyable`] that takes and runs whatever teardown is pending at
//! destruction time. Taking guarantees the final teardown runs at most once.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::args::Args;
use crate::destroyable::Destroyable;
use crate::error::{BoxError, ModifierError, Result};
use crate::reactive::{untrack, Memo, Tag};

/// Position of a slot in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub usize);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cleanup action returned by an effect callback.
pub struct Teardown(Box<dyn FnOnce() -> std::result::Result<(), BoxError> + Send>);

impl Teardown {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(move || {
            f();
            Ok(())
        }))
    }

    /// A teardown that can fail.
    pub fn fallible<F>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<(), BoxError> + Send + 'static,
    {
        Self(Box::new(f))
    }

    fn run(self) -> std::result::Result<(), BoxError> {
        (self.0)()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Teardown")
    }
}

/// Values an effect callback may return.
///
/// Implemented for `()`, [`Teardown`], `Option<Teardown>`, and `Result`s of
/// those whose error converts into a [`BoxError`].
pub trait IntoSyncOutcome {
    fn into_sync_outcome(self) -> std::result::Result<Option<Teardown>, BoxError>;
}

impl IntoSyncOutcome for () {
    fn into_sync_outcome(self) -> std::result::Result<Option<Teardown>, BoxError> {
        Ok(None)
    }
}

impl IntoSyncOutcome for Teardown {
    fn into_sync_outcome(self) -> std::result::Result<Option<Teardown>, BoxError> {
        Ok(Some(self))
    }
}

impl IntoSyncOutcome for Option<Teardown> {
    fn into_sync_outcome(self) -> std::result::Result<Option<Teardown>, BoxError> {
        Ok(self)
    }
}

impl<T, E> IntoSyncOutcome for std::result::Result<T, E>
where
    T: IntoSyncOutcome,
    E: Into<BoxError>,
{
    fn into_sync_outcome(self) -> std::result::Result<Option<Teardown>, BoxError> {
        match self {
            Ok(value) => value.into_sync_outcome(),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Default)]
struct SlotState {
    last_cleanup: Option<Teardown>,
}

/// One registered on-sync effect.
pub struct EffectSlot {
    index: SlotIndex,
    memo: Memo<(), ModifierError>,
    state: Arc<Mutex<SlotState>>,
}

impl EffectSlot {
    /// Wrap `callback` for `element` and hook its final teardown to `owner`.
    pub(crate) fn new<E, F, R>(
        index: SlotIndex,
        element: Arc<E>,
        args: Args,
        callback: F,
        owner: &Destroyable,
    ) -> Self
    where
        E: Send + Sync + 'static,
        F: FnMut(&E, &Args) -> R + Send + 'static,
        R: IntoSyncOutcome,
    {
        let state = Arc::new(Mutex::new(SlotState::default()));

        let pending = Arc::clone(&state);
        owner.register_destructor(move || {
            let teardown = pending.lock().last_cleanup.take();
            match teardown {
                Some(teardown) => {
                    trace!(slot = %index, "running final teardown");
                    teardown
                        .run()
                        .map_err(|source| ModifierError::Teardown { slot: index, source }.into())
                }
                None => Ok(()),
            }
        });

        let callback = Mutex::new(callback);
        let run_state = Arc::clone(&state);
        let memo = Memo::try_new(move || -> Result<()> {
            let teardown = run_state.lock().last_cleanup.take();
            if let Some(teardown) = teardown {
                trace!(slot = %index, "running teardown before re-sync");
                untrack(|| teardown.run())
                    .map_err(|source| ModifierError::Teardown { slot: index, source })?;
            }

            trace!(slot = %index, "running on-sync effect");
            let outcome = {
                let mut callback = callback.lock();
                (*callback)(element.as_ref(), &args)
            };
            let cleanup = outcome
                .into_sync_outcome()
                .map_err(|source| ModifierError::Effect { slot: index, source })?;
            run_state.lock().last_cleanup = cleanup;
            Ok(())
        });

        Self { index, memo, state }
    }

    pub fn index(&self) -> SlotIndex {
        self.index
    }

    /// Force the slot: run it if it has never run or a dependency changed.
    pub fn sync(&self) -> Result<()> {
        self.memo.try_get()
    }

    /// The tag that changes whenever this slot re-runs or goes stale.
    pub fn tag(&self) -> &Tag {
        self.memo.tag()
    }

    /// Whether a teardown from the last run is waiting.
    pub fn has_pending_teardown(&self) -> bool {
        self.state.lock().last_cleanup.is_some()
    }
}

impl fmt::Debug for EffectSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectSlot")
            .field("index", &self.index)
            .field("memo", &self.memo)
            .field("pending_teardown", &self.has_pending_teardown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;

    type Log = Arc<Mutex<Vec<String>>>;

    fn slot_reading(signal: &Signal<i32>, log: &Log, owner: &Destroyable) -> EffectSlot {
        let (signal, log) = (signal.clone(), log.clone());
        EffectSlot::new(
            SlotIndex(0),
            Arc::new(()),
            Args::from_named(Default::default()),
            move |_: &(), _: &Args| {
                let value = signal.get();
                log.lock().push(format!("run {value}"));
                let log = log.clone();
                Teardown::new(move || log.lock().push(format!("teardown {value}")))
            },
            owner,
        )
    }

    #[test]
    fn teardown_runs_before_next_run() {
        let log = Log::default();
        let owner = Destroyable::new();
        let signal = Signal::new(1);
        let slot = slot_reading(&signal, &log, &owner);

        slot.sync().unwrap();
        slot.sync().unwrap();
        signal.set(2);
        slot.sync().unwrap();

        assert_eq!(*log.lock(), vec!["run 1", "teardown 1", "run 2"]);
        assert!(slot.has_pending_teardown());
    }

    #[test]
    fn destroy_runs_final_teardown_once() {
        let log = Log::default();
        let owner = Destroyable::new();
        let signal = Signal::new(1);
        let slot = slot_reading(&signal, &log, &owner);

        slot.sync().unwrap();
        owner.destroy().unwrap();
        owner.destroy().unwrap();

        assert_eq!(*log.lock(), vec!["run 1", "teardown 1"]);
        assert!(!slot.has_pending_teardown());
    }

    #[test]
    fn unit_and_result_outcomes() {
        assert!(().into_sync_outcome().unwrap().is_none());
        assert!(Some(Teardown::new(|| ())).into_sync_outcome().unwrap().is_some());

        let ok: std::result::Result<Teardown, &str> = Ok(Teardown::new(|| ()));
        assert!(ok.into_sync_outcome().unwrap().is_some());

        let err: std::result::Result<(), &str> = Err("nope");
        assert_eq!(err.into_sync_outcome().unwrap_err().to_string(), "nope");
    }

    #[test]
    fn failing_callback_reports_slot() {
        let owner = Destroyable::new();
        let slot = EffectSlot::new(
            SlotIndex(3),
            Arc::new(()),
            Args::from_named(Default::default()),
            |_: &(), _: &Args| -> std::result::Result<(), BoxError> { Err("bad element".into()) },
            &owner,
        );

        let err = slot.sync().unwrap_err();
        assert!(matches!(err, ModifierError::Effect { slot: SlotIndex(3), .. }));
    }

    #[test]
    fn slot_index_display() {
        assert_eq!(SlotIndex(4).to_string(), "#4");
    }
}
