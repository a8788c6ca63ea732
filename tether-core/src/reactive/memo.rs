//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when one of the
//! tags it read during its last computation has changed.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation inside a tracking frame
//!    and caches the result together with the newest revision among the
//!    tags it read, taken once the computation has finished.
//!
//! 2. When accessed again, if every recorded tag is still at or below that
//!    snapshot, the cached value is returned without running anything.
//!
//! 3. Otherwise the computation runs again and records a fresh set of tags.
//!
//! Reading a memo from inside another computation records the memo's own
//! tag, so invalidation flows transitively through chains of memos.
//!
//! # Failing computations
//!
//! A memo built with [`Memo::try_new`] wraps a fallible computation. An `Err`
//! is returned to the caller but never cached: the memo is left without a
//! value and the next access runs the computation again.
//!
//! # Thread Safety
//!
//! The cache is protected by a mutex, but the computation itself runs with
//! the lock released. Forcing a memo from inside its own computation is a
//! cycle and panics.

use std::convert::Infallible;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::runtime::{Revision, CONSTANT};
use super::tag::{Tag, TagId};

/// Cache state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A value is cached but a dependency has moved past the snapshot.
    MaybeDirty,

    /// No value is cached; the next access computes.
    Dirty,
}

type Compute<T, E> = dyn Fn() -> Result<T, E> + Send + Sync;

struct MemoCache<T> {
    value: Option<T>,
    /// Newest revision among the dependencies, taken after the computation.
    snapshot: Revision,
    /// Set while the computation is running, to detect cycles.
    computing: bool,
}

struct MemoInner<T, E> {
    tag: Tag,
    compute: Box<Compute<T, E>>,
    cache: Mutex<MemoCache<T>>,
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Returned by clone on every access.
/// - `E`: The error type of a fallible computation. Defaults to
///   [`Infallible`] for memos created with [`Memo::new`].
pub struct Memo<T, E = Infallible> {
    inner: Arc<MemoInner<T, E>>,
}

impl<T> Memo<T, Infallible>
where
    T: Clone + Send + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::try_new(move || Ok(compute()))
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<T, E> Memo<T, E>
where
    T: Clone + Send + 'static,
    E: 'static,
{
    /// Create a memo over a fallible computation.
    pub fn try_new<F>(compute: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(MemoInner {
                tag: Tag::combinator(),
                compute: Box::new(compute),
                cache: Mutex::new(MemoCache {
                    value: None,
                    snapshot: CONSTANT,
                    computing: false,
                }),
            }),
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> TagId {
        self.inner.tag.id()
    }

    /// The tag recorded by computations that read this memo.
    pub fn tag(&self) -> &Tag {
        &self.inner.tag
    }

    /// Get the current value, recomputing if a dependency changed.
    ///
    /// This is the main entry point for reading a memo's value. The read is
    /// recorded in the enclosing tracking frame whether or not the memo
    /// recomputed.
    ///
    /// # Panics
    ///
    /// Panics if called from inside this memo's own computation.
    pub fn try_get(&self) -> Result<T, E> {
        {
            let mut cache = self.inner.cache.lock();
            if let Some(value) = &cache.value {
                if self.inner.tag.children_value() <= cache.snapshot {
                    let value = value.clone();
                    drop(cache);
                    ReactiveContext::consume(&self.inner.tag);
                    return Ok(value);
                }
            }
            if cache.computing {
                drop(cache);
                panic!("cyclic dependency detected while computing memo {:?}", self.id());
            }
            cache.computing = true;
        }

        let result = self.recompute();
        ReactiveContext::consume(&self.inner.tag);
        result
    }

    /// Run the computation in a fresh tracking frame and store the outcome.
    fn recompute(&self) -> Result<T, E> {
        struct Computing<'a, T>(&'a Mutex<MemoCache<T>>);

        impl<T> Drop for Computing<'_, T> {
            fn drop(&mut self) {
                self.0.lock().computing = false;
            }
        }

        let _computing = Computing(&self.inner.cache);
        let ctx = ReactiveContext::enter(self.inner.tag.id());
        let result = (self.inner.compute)();
        self.inner.tag.update(ctx.finish());
        let snapshot = self.inner.tag.children_value();

        let mut cache = self.inner.cache.lock();
        match &result {
            Ok(value) => {
                cache.value = Some(value.clone());
                cache.snapshot = snapshot;
            }
            Err(_) => cache.value = None,
        }
        result
    }

    /// Mark the memo as definitely needing recomputation.
    pub fn mark_dirty(&self) {
        self.inner.cache.lock().value = None;
    }

    /// Get the current cache state without forcing anything.
    pub fn state(&self) -> MemoState {
        let cache = self.inner.cache.lock();
        match cache.value {
            None => MemoState::Dirty,
            Some(_) if self.inner.tag.children_value() <= cache.snapshot => MemoState::Clean,
            Some(_) => MemoState::MaybeDirty,
        }
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.cache.lock().value.is_some()
    }

    /// Number of tags read by the last computation.
    pub fn dependency_count(&self) -> usize {
        self.inner.tag.child_count()
    }
}

impl<T, E> Clone for Memo<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Debug for Memo<T, E>
where
    T: Clone + Send + 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
