//! Revision Clock
//!
//! The runtime is the shared clock that every tag is measured against. It
//! replaces an explicit subscriber graph: instead of pushing notifications to
//! dependents, every write stamps its tag with a fresh revision, and every
//! cached computation remembers the revision at which it last ran.
//!
//! # How It Works
//!
//! 1. The clock starts at [`INITIAL`] and only ever moves forward.
//!
//! 2. Writing to a tracked cell calls [`Runtime::bump`] and stores the new
//!    revision in the cell's tag.
//!
//! 3. A memo stores the revision observed *before* it ran its computation.
//!    It is still valid as long as none of the tags it read carries a newer
//!    revision.
//!
//! Validation is therefore pull-based: nothing happens on write except the
//! bump, and all the work is deferred until somebody asks for a value.

use std::sync::atomic::{AtomicU64, Ordering};

use super::context::ReactiveContext;

/// A point in time on the revision clock.
pub type Revision = u64;

/// Revision of tags that can never change.
pub const CONSTANT: Revision = 0;

/// Revision of freshly created dirtyable tags.
pub const INITIAL: Revision = 1;

static REVISION: AtomicU64 = AtomicU64::new(INITIAL);

/// The global revision clock.
///
/// This is a namespace type; it carries no state of its own.
pub struct Runtime;

impl Runtime {
    /// The most recent revision handed out.
    pub fn current_revision() -> Revision {
        REVISION.load(Ordering::SeqCst)
    }

    /// Advance the clock and return the new revision.
    pub(crate) fn bump() -> Revision {
        REVISION.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Check if we're inside a tracking frame.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
