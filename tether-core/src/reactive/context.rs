//! Reactive Context
//!
//! The reactive context records which tags are read while a computation
//! runs. This is what makes dependency tracking automatic: a memo never
//! declares its inputs, it simply reads them, and every read lands in the
//! innermost tracking frame.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running a memo pushes a tracking
//! frame; when the computation completes the frame is popped and its
//! dependencies become the children of the memo's tag.
//!
//! [`untrack`] pushes a frame that swallows reads, so work done inside it
//! does not become a dependency of the enclosing computation.

use std::cell::RefCell;

use super::tag::{Tag, TagId, TagSet};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug)]
enum Frame {
    Tracking {
        /// The tag of the computation that owns this frame.
        owner: TagId,
        /// Tags read so far, deduplicated, in first-read order.
        dependencies: TagSet,
    },
    Untracked,
}

/// Guard that pops the tracking frame when dropped or finished.
///
/// This keeps the context stack balanced even if the computation panics.
pub struct ReactiveContext {
    owner: TagId,
    finished: bool,
}

impl ReactiveContext {
    /// Enter a new tracking frame owned by the given tag.
    ///
    /// While the frame is innermost, every consumed tag is recorded in it.
    pub fn enter(owner: TagId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(Frame::Tracking {
                owner,
                dependencies: TagSet::new(),
            });
        });

        Self {
            owner,
            finished: false,
        }
    }

    /// Check if reads are currently being recorded.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Frame::Tracking { .. })))
    }

    /// The owner of the innermost tracking frame, if reads are being recorded.
    pub fn current_owner() -> Option<TagId> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(Frame::Tracking { owner, .. }) => Some(*owner),
            _ => None,
        })
    }

    /// Record a read of `tag` in the innermost frame.
    ///
    /// Called by tracked cells and memos whenever they are read.
    pub fn consume(tag: &Tag) {
        CONTEXT_STACK.with(|stack| {
            if let Some(Frame::Tracking { dependencies, .. }) = stack.borrow_mut().last_mut() {
                let id = tag.id();
                if !dependencies.iter().any(|dep| dep.id() == id) {
                    dependencies.push(tag.clone());
                }
            }
        });
    }

    /// Pop this frame and return the tags it recorded.
    pub fn finish(mut self) -> TagSet {
        self.finished = true;
        self.pop()
    }

    fn pop(&self) -> TagSet {
        CONTEXT_STACK.with(|stack| match stack.borrow_mut().pop() {
            Some(Frame::Tracking {
                owner,
                dependencies,
            }) => {
                debug_assert_eq!(
                    owner, self.owner,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.owner, owner
                );
                dependencies
            }
            other => {
                debug_assert!(false, "ReactiveContext mismatch: popped {other:?}");
                TagSet::new()
            }
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}

/// Run `f` without recording any reads in the enclosing frame.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    struct UntrackGuard;

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            CONTEXT_STACK.with(|stack| {
                let popped = stack.borrow_mut().pop();
                debug_assert!(matches!(popped, Some(Frame::Untracked)));
            });
        }
    }

    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Frame::Untracked));
    let _guard = UntrackGuard;
    f()
}
