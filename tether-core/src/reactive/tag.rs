//! Validation tags.
//!
//! A tag is the unit of dependency tracking. Tracked cells own a *dirtyable*
//! tag that is stamped with a fresh revision on every write. Memos own a
//! *combinator* tag whose value is the newest revision among the tags read by
//! their last computation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::runtime::{Revision, Runtime, CONSTANT, INITIAL};

/// Dependencies recorded by one tracking frame.
pub type TagSet = SmallVec<[Tag; 4]>;

/// Unique identifier for a tag.
///
/// Used to deduplicate reads inside one tracking frame and to check that
/// frames are popped in the order they were pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId(u64);

impl TagId {
    /// Generate a new unique tag ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

enum TagKind {
    Dirtyable {
        revision: AtomicU64,
    },
    Combinator {
        children: RwLock<TagSet>,
        /// Lower bound carried over from previous children, so the value of
        /// a combinator never moves backwards when its children are swapped.
        floor: AtomicU64,
    },
}

struct TagInner {
    id: TagId,
    kind: TagKind,
}

/// A shared validation token.
///
/// Cloning a tag is cheap and yields a handle to the same token.
#[derive(Clone)]
pub struct Tag(Arc<TagInner>);

impl Tag {
    /// Create a tag that can be dirtied by writes.
    pub fn dirtyable() -> Self {
        Self(Arc::new(TagInner {
            id: TagId::new(),
            kind: TagKind::Dirtyable {
                revision: AtomicU64::new(INITIAL),
            },
        }))
    }

    /// Create a tag that mirrors a changing set of children.
    pub fn combinator() -> Self {
        Self(Arc::new(TagInner {
            id: TagId::new(),
            kind: TagKind::Combinator {
                children: RwLock::new(TagSet::new()),
                floor: AtomicU64::new(CONSTANT),
            },
        }))
    }

    pub fn id(&self) -> TagId {
        self.0.id
    }

    /// The newest revision this tag has observed.
    pub fn value(&self) -> Revision {
        match &self.0.kind {
            TagKind::Dirtyable { revision } => revision.load(Ordering::SeqCst),
            TagKind::Combinator { floor, .. } => {
                self.children_value().max(floor.load(Ordering::SeqCst))
            }
        }
    }

    /// Newest revision among the current children, ignoring the floor.
    ///
    /// For a dirtyable tag this is the same as [`Tag::value`].
    pub fn children_value(&self) -> Revision {
        match &self.0.kind {
            TagKind::Dirtyable { revision } => revision.load(Ordering::SeqCst),
            TagKind::Combinator { children, .. } => children
                .read()
                .iter()
                .map(Tag::value)
                .max()
                .unwrap_or(CONSTANT),
        }
    }

    /// Whether nothing this tag depends on changed after `snapshot`.
    pub fn validate(&self, snapshot: Revision) -> bool {
        self.value() <= snapshot
    }

    /// Stamp the tag with a fresh revision.
    ///
    /// # Panics
    ///
    /// Panics on a combinator tag; those only change through their children.
    pub fn dirty(&self) {
        match &self.0.kind {
            TagKind::Dirtyable { revision } => {
                revision.store(Runtime::bump(), Ordering::SeqCst);
            }
            TagKind::Combinator { .. } => {
                panic!("combinator tags cannot be dirtied directly")
            }
        }
    }

    /// Replace the children of a combinator tag.
    ///
    /// The value of the old children is folded into the floor, so anything
    /// that validated against the previous children still observes the change
    /// that caused this update.
    pub(crate) fn update(&self, next: TagSet) {
        let TagKind::Combinator { children, floor } = &self.0.kind else {
            panic!("only combinator tags have children");
        };
        let previous = self.value();
        *children.write() = next;
        floor.fetch_max(previous, Ordering::SeqCst);
    }

    /// Number of direct children (always zero for dirtyable tags).
    pub fn child_count(&self) -> usize {
        match &self.0.kind {
            TagKind::Dirtyable { .. } => 0,
            TagKind::Combinator { children, .. } => children.read().len(),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("id", &self.0.id)
            .field("value", &self.value())
            .field("children", &self.child_count())
            .finish()
    }
}
