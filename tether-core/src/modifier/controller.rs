//! Binding controller.
//!
//! A [`ModifierInstance`] drives one modifier through the lifecycle of one
//! host resource:
//!
//! ```text
//! Uninitialized --modify--> Bound --destroy/drop--> TornDown
//!       |                     ^ |
//!       |                     +-+ modify / recheck
//!       +--config/setup error--> Failed --destroy/drop--> TornDown
//! ```
//!
//! The first `modify` runs the blueprint, collects its effects and forces them
//! once. Every later `modify` or `recheck` forces the aggregate cache, which
//! re-runs only the effects whose dependencies changed.

use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, debug_span, trace, warn};

use super::aggregate::AggregateCache;
use super::args::{Args, NamedArgs};
use super::definition::ModifierDefinition;
use super::registry::{EffectRegistry, SetupContext};
use crate::destroyable::Destroyable;
use crate::error::{ModifierError, Result};
use crate::owner::Owner;
use crate::reactive::untrack;

/// Observable lifecycle phase of a [`ModifierInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    Uninitialized,
    Bound,
    Failed,
    TornDown,
}

struct Bound<E> {
    element: Arc<E>,
    args: Args,
    aggregate: AggregateCache,
}

enum BindingState<E> {
    Uninitialized,
    Bound(Bound<E>),
    Failed,
    TornDown,
}

impl<E> BindingState<E> {
    fn phase(&self) -> BindingPhase {
        match self {
            BindingState::Uninitialized => BindingPhase::Uninitialized,
            BindingState::Bound(_) => BindingPhase::Bound,
            BindingState::Failed => BindingPhase::Failed,
            BindingState::TornDown => BindingPhase::TornDown,
        }
    }
}

/// One modifier attached to one host resource.
pub struct ModifierInstance<E> {
    definition: ModifierDefinition<E>,
    owner: Arc<dyn Owner>,
    destroyable: Destroyable,
    state: BindingState<E>,
}

impl<E> ModifierInstance<E>
where
    E: Send + Sync + 'static,
{
    pub(crate) fn new(definition: ModifierDefinition<E>, owner: Arc<dyn Owner>) -> Self {
        Self {
            definition,
            owner,
            destroyable: Destroyable::new(),
            state: BindingState::Uninitialized,
        }
    }

    /// Evaluate the modifier against `element` with the current arguments.
    ///
    /// The first call binds: it runs the blueprint and installs every effect.
    /// Later calls push the arguments into the tracked argument cells and
    /// re-run whichever effects that made stale.
    ///
    /// # Panics
    ///
    /// Panics if the instance was destroyed, or if a bound instance is handed
    /// a different element.
    pub fn modify(&mut self, element: Arc<E>, positional: Vec<Value>, named: NamedArgs) -> Result<()> {
        if let BindingState::Uninitialized = self.state {
            return self.bind(element, positional, named);
        }
        match &self.state {
            BindingState::Uninitialized => unreachable!(),
            BindingState::Bound(bound) => {
                assert!(
                    Arc::ptr_eq(&bound.element, &element),
                    "a modifier instance cannot be moved to a different element"
                );
                if bound.args.update(positional, named) {
                    trace!("arguments changed");
                }
                bound.aggregate.force_reevaluate()
            }
            BindingState::Failed => Err(ModifierError::Poisoned),
            BindingState::TornDown => panic!("cannot evaluate a modifier after it has been destroyed"),
        }
    }

    /// Like [`modify`](Self::modify), for hosts that only know the element
    /// dynamically. An element that is not an `E` is a configuration error
    /// and poisons an unbound instance.
    ///
    /// A mismatch after binding only fails that call; the instance stays
    /// bound to its original element.
    pub fn modify_dyn(
        &mut self,
        element: Arc<dyn Any + Send + Sync>,
        positional: Vec<Value>,
        named: NamedArgs,
    ) -> Result<()> {
        match element.downcast::<E>() {
            Ok(element) => self.modify(element, positional, named),
            Err(_) => {
                if let BindingState::TornDown = self.state {
                    panic!("cannot evaluate a modifier after it has been destroyed");
                }
                let expected = self.definition.options().describe_element::<E>();
                warn!(%expected, "modifier applied to an element of the wrong type");
                if let BindingState::Uninitialized = self.state {
                    self.state = BindingState::Failed;
                }
                Err(ModifierError::Configuration { expected })
            }
        }
    }

    /// Re-force the effects without touching the arguments.
    ///
    /// # Panics
    ///
    /// Panics before the first `modify` and after `destroy`.
    pub fn recheck(&self) -> Result<()> {
        match &self.state {
            BindingState::Bound(bound) => bound.aggregate.force_reevaluate(),
            BindingState::Failed => Err(ModifierError::Poisoned),
            BindingState::Uninitialized => panic!("cannot re-check a modifier before it is bound"),
            BindingState::TornDown => panic!("cannot evaluate a modifier after it has been destroyed"),
        }
    }

    fn bind(&mut self, element: Arc<E>, positional: Vec<Value>, named: NamedArgs) -> Result<()> {
        let span = debug_span!(
            "bind",
            element = %self.definition.options().describe_element::<E>()
        );
        let _enter = span.enter();
        debug!("binding modifier");

        let args = Args::new(self.definition.options().positional_names(), positional, named);
        let registry = match self.run_setup_once(&element, &args) {
            Ok(registry) => registry,
            Err(err) => {
                debug!(error = %err, "modifier setup failed");
                self.state = BindingState::Failed;
                return Err(err);
            }
        };

        debug!(slots = registry.len(), "modifier setup complete");
        let aggregate = AggregateCache::new(Arc::new(registry));
        let installed = aggregate.force_reevaluate();
        self.state = BindingState::Bound(Bound {
            element,
            args,
            aggregate,
        });
        installed
    }

    /// Run the blueprint, untracked, and freeze what it registered.
    fn run_setup_once(&self, element: &Arc<E>, args: &Args) -> Result<EffectRegistry> {
        let mut registry = EffectRegistry::new();
        let outcome = {
            let mut cx = SetupContext::new(
                &mut registry,
                element,
                args,
                self.owner.as_ref(),
                &self.destroyable,
            );
            untrack(|| self.definition.run_blueprint(&mut cx))
        };
        outcome.map_err(ModifierError::Setup)?;
        registry.freeze();
        Ok(registry)
    }

    /// The argument view, once bound.
    pub fn args(&self) -> Option<&Args> {
        match &self.state {
            BindingState::Bound(bound) => Some(&bound.args),
            _ => None,
        }
    }

    /// The host resource, once bound.
    pub fn element(&self) -> Option<&Arc<E>> {
        match &self.state {
            BindingState::Bound(bound) => Some(&bound.element),
            _ => None,
        }
    }

    /// Number of effects the blueprint declared, once bound.
    pub fn effect_count(&self) -> Option<usize> {
        match &self.state {
            BindingState::Bound(bound) => Some(bound.aggregate.registry().len()),
            _ => None,
        }
    }
}

impl<E> ModifierInstance<E> {
    pub fn phase(&self) -> BindingPhase {
        self.state.phase()
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, BindingState::Bound(_))
    }

    /// The owner every effect's final teardown is registered with.
    ///
    /// Associate it with a parent [`Destroyable`] to tie the instance to a
    /// larger lifetime.
    pub fn destroyable(&self) -> &Destroyable {
        &self.destroyable
    }

    /// Run every outstanding teardown, in registration order, and retire the
    /// instance. A second call is a no-op.
    pub fn destroy(&mut self) -> Result<()> {
        let previous = mem::replace(&mut self.state, BindingState::TornDown);
        if let BindingState::TornDown = previous {
            return Ok(());
        }
        debug!(phase = ?previous.phase(), "destroying modifier");
        let result = self.destroyable.destroy();
        drop(previous);
        result.map_err(ModifierError::from)
    }
}

impl<E> Drop for ModifierInstance<E> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            warn!(error = %err, "teardown failed while dropping modifier");
        }
    }
}

impl<E> fmt::Debug for ModifierInstance<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierInstance")
            .field("phase", &self.state.phase())
            .field("options", self.definition.options())
            .field("destroyable", &self.destroyable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{create_modifier, ModifierOptions, Teardown};
    use crate::owner::Registry;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canvas;

    fn owner() -> Arc<dyn Owner> {
        Arc::new(Registry::new())
    }

    #[test]
    fn first_modify_binds_and_runs_effects() {
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        let definition = create_modifier::<Canvas, _, _>(
            move |cx| {
                let runs = runs_clone.clone();
                cx.on().sync(move |_, _| {
                    runs.fetch_add(1, Ordering::SeqCst);
                });
            },
            ModifierOptions::default(),
        );
        let mut instance = definition.instantiate(owner());
        assert_eq!(instance.phase(), BindingPhase::Uninitialized);

        let canvas = Arc::new(Canvas);
        instance.modify(canvas.clone(), vec![], NamedArgs::new()).unwrap();
        assert_eq!(instance.phase(), BindingPhase::Bound);
        assert_eq!(instance.effect_count(), Some(1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        instance.modify(canvas, vec![], NamedArgs::new()).unwrap();
        instance.recheck().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blueprint_runs_once_per_instance() {
        let setups = Arc::new(AtomicUsize::new(0));
        let setups_clone = setups.clone();
        let definition = create_modifier::<Canvas, _, _>(
            move |_cx| {
                setups_clone.fetch_add(1, Ordering::SeqCst);
            },
            ModifierOptions::default(),
        );

        let mut a = definition.instantiate(owner());
        let mut b = definition.instantiate(owner());
        let canvas = Arc::new(Canvas);
        a.modify(canvas.clone(), vec![], NamedArgs::new()).unwrap();
        a.modify(canvas.clone(), vec![], NamedArgs::new()).unwrap();
        b.modify(canvas, vec![], NamedArgs::new()).unwrap();

        assert_eq!(setups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn changed_argument_reruns_effect() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let definition = create_modifier::<Canvas, _, _>(
            move |cx| {
                let log = log_clone.clone();
                cx.on().sync(move |_, args: &Args| {
                    log.lock().push(args.get("color"));
                });
            },
            ModifierOptions::new().positional(["color"]),
        );
        let mut instance = definition.instantiate(owner());
        let canvas = Arc::new(Canvas);

        instance.modify(canvas.clone(), vec![json!("red")], NamedArgs::new()).unwrap();
        instance.modify(canvas.clone(), vec![json!("red")], NamedArgs::new()).unwrap();
        instance.modify(canvas, vec![json!("blue")], NamedArgs::new()).unwrap();

        assert_eq!(*log.lock(), vec![Some(json!("red")), Some(json!("blue"))]);
    }

    #[test]
    fn setup_failure_poisons_instance() {
        let definition = create_modifier::<Canvas, _, _>(
            |_cx| Err::<(), _>("no context"),
            ModifierOptions::default(),
        );
        let mut instance = definition.instantiate(owner());
        let canvas = Arc::new(Canvas);

        let err = instance.modify(canvas.clone(), vec![], NamedArgs::new()).unwrap_err();
        assert!(matches!(err, ModifierError::Setup(_)));
        assert_eq!(instance.phase(), BindingPhase::Failed);

        let err = instance.modify(canvas, vec![], NamedArgs::new()).unwrap_err();
        assert!(matches!(err, ModifierError::Poisoned));
        assert!(matches!(instance.recheck(), Err(ModifierError::Poisoned)));
    }

    #[test]
    fn wrong_element_type_is_configuration_error() {
        let definition = create_modifier::<Canvas, _, _>(
            |_cx| (),
            ModifierOptions::new().element_name("HTMLCanvasElement"),
        );
        let mut instance = definition.instantiate(owner());

        let err = instance
            .modify_dyn(Arc::new(42_u32), vec![], NamedArgs::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "element must be an instance of HTMLCanvasElement");
        assert_eq!(instance.phase(), BindingPhase::Failed);
    }

    #[test]
    fn wrong_element_after_bind_keeps_instance_bound() {
        let definition = create_modifier::<Canvas, _, _>(|_cx| (), ModifierOptions::default());
        let mut instance = definition.instantiate(owner());
        instance.modify(Arc::new(Canvas), vec![], NamedArgs::new()).unwrap();

        let err = instance
            .modify_dyn(Arc::new(42_u32), vec![], NamedArgs::new())
            .unwrap_err();
        assert!(matches!(err, ModifierError::Configuration { .. }));
        assert_eq!(instance.phase(), BindingPhase::Bound);
        instance.recheck().unwrap();
    }

    #[test]
    fn modify_dyn_accepts_matching_element() {
        let definition = create_modifier::<Canvas, _, _>(|_cx| (), ModifierOptions::default());
        let mut instance = definition.instantiate(owner());

        instance.modify_dyn(Arc::new(Canvas), vec![], NamedArgs::new()).unwrap();
        assert!(instance.is_bound());
    }

    #[test]
    fn destroy_runs_teardowns_and_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let definition = create_modifier::<Canvas, _, _>(
            move |cx| {
                for name in ["a", "b"] {
                    let log = log_clone.clone();
                    cx.on().sync(move |_, _| {
                        let log = log.clone();
                        Teardown::new(move || log.lock().push(name))
                    });
                }
            },
            ModifierOptions::default(),
        );
        let mut instance = definition.instantiate(owner());
        instance.modify(Arc::new(Canvas), vec![], NamedArgs::new()).unwrap();

        instance.destroy().unwrap();
        instance.destroy().unwrap();
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(instance.phase(), BindingPhase::TornDown);
        assert!(instance.destroyable().is_destroyed());
    }

    #[test]
    fn destroy_before_bind_is_allowed() {
        let definition = create_modifier::<Canvas, _, _>(|_cx| (), ModifierOptions::default());
        let mut instance = definition.instantiate(owner());
        instance.destroy().unwrap();
        assert_eq!(instance.phase(), BindingPhase::TornDown);
    }

    #[test]
    #[should_panic(expected = "after it has been destroyed")]
    fn modify_after_destroy_panics() {
        let definition = create_modifier::<Canvas, _, _>(|_cx| (), ModifierOptions::default());
        let mut instance = definition.instantiate(owner());
        let canvas = Arc::new(Canvas);
        instance.modify(canvas.clone(), vec![], NamedArgs::new()).unwrap();
        instance.destroy().unwrap();
        let _ = instance.modify(canvas, vec![], NamedArgs::new());
    }

    #[test]
    #[should_panic(expected = "different element")]
    fn rebinding_to_another_element_panics() {
        let definition = create_modifier::<Canvas, _, _>(|_cx| (), ModifierOptions::default());
        let mut instance = definition.instantiate(owner());
        instance.modify(Arc::new(Canvas), vec![], NamedArgs::new()).unwrap();
        let _ = instance.modify(Arc::new(Canvas), vec![], NamedArgs::new());
    }
}
