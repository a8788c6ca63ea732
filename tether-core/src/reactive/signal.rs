//! Signal Implementation
//!
//! A Signal is the fundamental tracked cell. It holds a value and a
//! dirtyable tag.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a tracking frame (a memo computation),
//!    its tag is recorded in that frame.
//!
//! 2. When a signal's value is written, its tag is stamped with a fresh
//!    revision.
//!
//! 3. The next time a memo that read the signal is forced, it sees a tag
//!    newer than its snapshot and recomputes.
//!
//! Signals never call anyone back. Re-evaluation only happens when a
//! consumer asks for its value again.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::tag::{Tag, TagId};

/// A tracked cell holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value (recorded if inside a memo)
/// let value = count.get();
///
/// // Update the value (invalidates memos that read it)
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The current value.
    value: Arc<RwLock<T>>,

    /// Stamped on every write.
    tag: Tag,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            tag: Tag::dirtyable(),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> TagId {
        self.tag.id()
    }

    /// The tag stamped by writes to this signal.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Get the current value, recording the read in the current frame.
    pub fn get(&self) -> T {
        ReactiveContext::consume(&self.tag);
        self.value.read().clone()
    }

    /// Borrow the current value, recording the read in the current frame.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        ReactiveContext::consume(&self.tag);
        f(&self.value.read())
    }

    /// Get the current value without tracking dependencies.
    ///
    /// Use this when you need to read the value without establishing
    /// a reactive dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and dirty the tag, even if the value is equal.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.tag.dirty();
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = f(&self.value.read());
        self.set(new_value);
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Set a new value, dirtying the tag only if it differs from the current one.
    ///
    /// Returns `true` if the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        {
            let mut guard = self.value.write();
            if *guard == value {
                return false;
            }
            *guard = value;
        }
        self.tag.dirty();
        true
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            tag: self.tag.clone(),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("revision", &self.tag.value())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;

    #[test]
    fn signal_get_set() {
        let signal = Signal::new(42);
        assert_eq!(signal.get(), 42);

        signal.set(100);
        assert_eq!(signal.get(), 100);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v * 2);
        assert_eq!(signal.get(), 20);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn set_always_dirties() {
        let signal = Signal::new(1);
        let snapshot = Runtime::current_revision();

        signal.set(1);
        assert!(!signal.tag().validate(snapshot));
    }

    #[test]
    fn set_if_changed_skips_equal_values() {
        let signal = Signal::new(String::from("a"));
        let snapshot = Runtime::current_revision();

        assert!(!signal.set_if_changed(String::from("a")));
        assert!(signal.tag().validate(snapshot));

        assert!(signal.set_if_changed(String::from("b")));
        assert!(!signal.tag().validate(snapshot));
        assert_eq!(signal.get_untracked(), "b");
    }

    #[test]
    fn reads_are_recorded_in_frame() {
        let signal = Signal::new(3);
        let ctx = ReactiveContext::enter(TagId::new());

        assert_eq!(signal.with(|v| v + 1), 4);
        let _ = signal.get_untracked();

        let deps = ctx.finish();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].id(), signal.id());
    }
}
