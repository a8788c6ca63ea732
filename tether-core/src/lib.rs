//! Tether Core
//!
//! This crate provides lifecycle-bound synchronized effects: modifiers whose
//! setup runs once per host resource and whose effects re-run, with teardown,
//! exactly when the tracked values they read change.
//!
//! It implements:
//!
//! - Autotracking primitives (tags, signals, memos)
//! - Effect slots, the setup pass and the aggregate cache
//! - The binding controller driven by a host renderer
//! - Destroyables and owner-based service lookup
//!
//! # Architecture
//!
//! - `reactive`: revision clock, tags, tracking frames, signals and memos
//! - `modifier`: argument view, effect slots, registry, binding controller
//! - `destroyable`: owners with ordered, exactly-once destructors
//! - `owner`: capability lookup used by `SetupContext::service`
//! - `error`: the crate error type
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_core::modifier::{create_modifier, ModifierOptions, NamedArgs, Teardown};
//! use tether_core::owner::Registry;
//! use tether_core::reactive::Signal;
//!
//! let theme = Signal::new(String::from("light"));
//!
//! let paint = create_modifier::<Canvas, _, _>(
//!     {
//!         let theme = theme.clone();
//!         move |cx| {
//!             let theme = theme.clone();
//!             cx.on().sync(move |canvas, args| {
//!                 canvas.fill(&theme.get(), args.get("x"));
//!                 Teardown::new(|| tracing::debug!("cleared"))
//!             });
//!         }
//!     },
//!     ModifierOptions::new().positional(["x"]),
//! );
//!
//! let mut instance = paint.instantiate(Arc::new(Registry::new()));
//! instance.modify(canvas.clone(), vec![10.into()], NamedArgs::new())?;
//!
//! theme.set(String::from("dark"));
//! instance.recheck()?; // tears down, then paints again
//! instance.destroy()?; // final teardown
//! ```

pub mod destroyable;
pub mod error;
pub mod modifier;
pub mod owner;
pub mod reactive;

pub use destroyable::Destroyable;
pub use error::{BoxError, DestroyError, ModifierError, Result};
pub use modifier::{create_modifier, Args, ModifierInstance, ModifierOptions, NamedArgs, Teardown};
pub use owner::{Owner, Registry};
pub use reactive::{untrack, Memo, Signal};
