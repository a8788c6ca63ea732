//! Lifecycle-bound modifiers.
//!
//! A modifier attaches synchronized effects to a host resource (usually a UI
//! element). Its blueprint runs once, when the host first evaluates it, and
//! declares effects with `cx.on().sync(..)`. Each effect re-runs whenever a
//! tracked value it read changes, and the teardown it returned runs before
//! the next run and when the instance is destroyed.
//!
//! Layering, bottom to top:
//!
//! - [`Args`]: argument view over tracked cells
//! - [`EffectSlot`]: one effect, memoized over its callback
//! - [`EffectRegistry`]: the slots collected during setup
//! - [`AggregateCache`]: one memo that forces every slot
//! - [`ModifierInstance`]: the binding state machine driven by the host

pub mod aggregate;
pub mod args;
pub mod controller;
pub mod definition;
pub mod options;
pub mod registry;
pub mod slot;

pub use aggregate::AggregateCache;
pub use args::{Args, NamedArgs};
pub use controller::{BindingPhase, ModifierInstance};
pub use definition::{create_modifier, IntoSetupResult, ModifierDefinition};
pub use options::ModifierOptions;
pub use registry::{EffectRegistry, On, SetupContext};
pub use slot::{EffectSlot, IntoSyncOutcome, SlotIndex, Teardown};
