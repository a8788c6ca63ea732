//! Reactive Primitives
//!
//! This module implements the dependency-tracking primitive the modifier
//! engine is built on: tracked cells (signals) and memoized computations.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Reading it inside a memo
//! records its tag; writing it stamps the tag with a fresh revision.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only
//! when one of the tags it read during its last run carries a revision newer
//! than the ones it saw when that run finished.
//!
//! # Implementation Notes
//!
//! There is no explicit dependency graph and no notification. A global
//! revision clock plus per-tag revisions is enough to answer "did anything I
//! read change since I last ran?", and a thread-local stack of tracking
//! frames collects the reads.

mod context;
mod memo;
mod runtime;
mod signal;
mod tag;

pub use context::{untrack, ReactiveContext};
pub use memo::{Memo, MemoState};
pub use runtime::{Revision, Runtime, CONSTANT, INITIAL};
pub use signal::Signal;
pub use tag::{Tag, TagId, TagSet};
