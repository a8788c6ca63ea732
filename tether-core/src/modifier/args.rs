//! Argument view.
//!
//! [`Args`] is what effect callbacks see as their arguments. It merges the
//! positional and named arguments of one invocation into a single mapping,
//! using the positional names declared in
//! [`ModifierOptions`](super::ModifierOptions):
//!
//! - declared positional names come first, in declaration order, and read the
//!   positional value at the same index;
//! - named arguments follow, in the order the host supplied them;
//! - a named argument whose key is also a positional name is shadowed.
//!
//! Every entry is a [`Signal`], so a callback that reads `x` re-runs when the
//! host later pushes a different value for `x`, and only then.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::reactive::{ReactiveContext, Signal, Tag};

/// Named arguments as supplied by the host, in invocation order.
pub type NamedArgs = IndexMap<String, Value>;

type Entry = Signal<Option<Value>>;

struct ArgsInner {
    positional_names: Vec<String>,
    entries: RwLock<IndexMap<String, Entry>>,
    /// Dirtied when the set of keys changes.
    keys: Tag,
}

/// Tracked view over the arguments of one modifier instance.
///
/// Cloning is cheap and shares the underlying cells, so a teardown that
/// captured a clone reads the arguments as they are when it runs.
#[derive(Clone)]
pub struct Args {
    inner: Arc<ArgsInner>,
}

impl Args {
    /// Build the view for the first invocation.
    ///
    /// Positional values beyond the declared names are ignored; declared
    /// names without a positional value read as absent.
    pub fn new(positional_names: &[String], positional: Vec<Value>, named: NamedArgs) -> Self {
        let mut entries = IndexMap::with_capacity(positional_names.len() + named.len());
        let mut positional = positional.into_iter();
        for name in positional_names {
            entries.insert(name.clone(), Signal::new(positional.next()));
        }
        for (key, value) in named {
            entries.entry(key).or_insert_with(|| Signal::new(Some(value)));
        }

        Self {
            inner: Arc::new(ArgsInner {
                positional_names: positional_names.to_vec(),
                entries: RwLock::new(entries),
                keys: Tag::dirtyable(),
            }),
        }
    }

    /// Build a view with named arguments only.
    pub fn from_named(named: NamedArgs) -> Self {
        Self::new(&[], Vec::new(), named)
    }

    /// Read the argument `name`.
    ///
    /// Returns `None` for unknown names and for declared positional names
    /// whose value was not supplied.
    pub fn get(&self, name: &str) -> Option<Value> {
        let entries = self.inner.entries.read();
        match entries.get(name) {
            Some(entry) => entry.get(),
            None => {
                ReactiveContext::consume(&self.inner.keys);
                None
            }
        }
    }

    /// Read the argument `name` and deserialize it into `T`.
    pub fn get_as<T>(&self, name: &str) -> Result<Option<T>, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        self.get(name).map(serde_json::from_value).transpose()
    }

    /// Read the positional argument at `index` through its declared name.
    pub fn positional(&self, index: usize) -> Option<Value> {
        let name = self.inner.positional_names.get(index)?;
        self.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        ReactiveContext::consume(&self.inner.keys);
        self.inner.entries.read().contains_key(name)
    }

    /// All keys: positional names first, then named keys, each once.
    pub fn keys(&self) -> Vec<String> {
        ReactiveContext::consume(&self.inner.keys);
        self.inner.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        ReactiveContext::consume(&self.inner.keys);
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read every present argument into a plain map.
    pub fn to_map(&self) -> NamedArgs {
        ReactiveContext::consume(&self.inner.keys);
        self.inner
            .entries
            .read()
            .iter()
            .filter_map(|(key, entry)| entry.get().map(|value| (key.clone(), value)))
            .collect()
    }

    pub fn positional_names(&self) -> &[String] {
        &self.inner.positional_names
    }

    /// Push the arguments of a later invocation.
    ///
    /// Only entries whose value actually changed are dirtied. Named keys
    /// that disappeared are cleared and removed; new ones are appended.
    /// Returns `true` if anything changed.
    pub fn update(&self, positional: Vec<Value>, mut named: NamedArgs) -> bool {
        let mut changed = false;
        let mut keys_changed = false;
        let mut entries = self.inner.entries.write();

        let mut positional = positional.into_iter();
        for name in &self.inner.positional_names {
            if let Some(entry) = entries.get(name) {
                changed |= entry.set_if_changed(positional.next());
            }
            named.shift_remove(name);
        }

        let positional_count = self.inner.positional_names.len();
        let stale: Vec<String> = entries
            .keys()
            .skip(positional_count)
            .filter(|key| !named.contains_key(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = entries.shift_remove(&key) {
                entry.set_if_changed(None);
            }
            keys_changed = true;
        }

        for (key, value) in named {
            match entries.get(&key) {
                Some(entry) => changed |= entry.set_if_changed(Some(value)),
                None => {
                    entries.insert(key, Signal::new(Some(value)));
                    keys_changed = true;
                }
            }
        }

        if keys_changed {
            self.inner.keys.dirty();
        }
        changed || keys_changed
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.entries.read();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v.get_untracked())))
            .finish()
    }
}
