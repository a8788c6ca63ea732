//! Effect registry and the setup pass.
//!
//! The registry collects the slots declared while the blueprint runs. It is
//! append-only during setup and frozen afterwards; from then on only the
//! slots' internal state changes, never their number or order.

use std::any::Any;
use std::sync::Arc;

use super::args::Args;
use super::slot::{EffectSlot, IntoSyncOutcome, SlotIndex};
use crate::destroyable::Destroyable;
use crate::error::Result;
use crate::owner::{lookup_service, Owner};
use crate::reactive::{ReactiveContext, Tag};

/// Ordered list of the slots of one modifier instance.
#[derive(Debug)]
pub struct EffectRegistry {
    slots: Vec<EffectSlot>,
    /// Dirtied on every push.
    tag: Tag,
    frozen: bool,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            tag: Tag::dirtyable(),
            frozen: false,
        }
    }

    /// Append a slot.
    ///
    /// # Panics
    ///
    /// Panics once the registry is frozen: effects can only be declared
    /// during the setup pass.
    pub fn push(&mut self, slot: EffectSlot) {
        assert!(
            !self.frozen,
            "`on.sync` cannot be called after the modifier setup pass has completed"
        );
        debug_assert_eq!(slot.index(), self.next_index());
        self.slots.push(slot);
        self.tag.dirty();
    }

    pub fn next_index(&self) -> SlotIndex {
        SlotIndex(self.slots.len())
    }

    /// Stop accepting slots.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Iterate slots in registration order, recording the read.
    pub fn iter(&self) -> std::slice::Iter<'_, EffectSlot> {
        ReactiveContext::consume(&self.tag);
        self.slots.iter()
    }

    pub fn get(&self, index: SlotIndex) -> Option<&EffectSlot> {
        self.slots.get(index.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// What a blueprint receives during the setup pass.
///
/// The context only lives for the duration of the blueprint call, so effects
/// cannot be declared once setup has returned.
pub struct SetupContext<'a, E> {
    registry: &'a mut EffectRegistry,
    element: &'a Arc<E>,
    args: &'a Args,
    owner: &'a dyn Owner,
    destroyable: &'a Destroyable,
}

impl<'a, E> SetupContext<'a, E>
where
    E: Send + Sync + 'static,
{
    pub(crate) fn new(
        registry: &'a mut EffectRegistry,
        element: &'a Arc<E>,
        args: &'a Args,
        owner: &'a dyn Owner,
        destroyable: &'a Destroyable,
    ) -> Self {
        Self {
            registry,
            element,
            args,
            owner,
            destroyable,
        }
    }

    /// Resolve the service registered as `service:<name>` on the owner.
    pub fn service<T>(&self, name: &str) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        lookup_service(self.owner, name)
    }

    /// The argument view effects will receive.
    pub fn args(&self) -> &Args {
        self.args
    }

    /// Entry point for declaring effects: `cx.on().sync(..)`.
    pub fn on(&mut self) -> On<'_, 'a, E> {
        On { cx: self }
    }

    /// Number of effects declared so far.
    pub fn effect_count(&self) -> usize {
        self.registry.len()
    }
}

/// Effect declarations, mirroring `on.sync` in the blueprint.
pub struct On<'c, 'a, E> {
    cx: &'c mut SetupContext<'a, E>,
}

impl<E> On<'_, '_, E>
where
    E: Send + Sync + 'static,
{
    /// Declare an effect that runs on install and whenever something it
    /// reads changes.
    ///
    /// The callback may return a [`Teardown`](super::Teardown), which runs
    /// before the next run and when the host is destroyed.
    pub fn sync<F, R>(self, callback: F) -> SlotIndex
    where
        F: FnMut(&E, &Args) -> R + Send + 'static,
        R: IntoSyncOutcome,
    {
        let cx = self.cx;
        let index = cx.registry.next_index();
        let slot = EffectSlot::new(
            index,
            Arc::clone(cx.element),
            cx.args.clone(),
            callback,
            cx.destroyable,
        );
        cx.registry.push(slot);
        index
    }
}
