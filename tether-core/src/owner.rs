//! Owners and capability lookup.
//!
//! Modifier blueprints resolve services relative to an [`Owner`]. The engine
//! only depends on the trait; [`Registry`] is the in-process implementation
//! used by hosts that have no container of their own.
//!
//! Entries are keyed by full name (`"service:session"`), so a registry can
//! hold more than one kind of capability.

use std::any::{type_name, Any};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{ModifierError, Result};

/// A type-erased capability.
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Resolves named capabilities.
pub trait Owner: Send + Sync {
    /// Look up a capability by its full name, e.g. `"service:session"`.
    fn lookup(&self, full_name: &str) -> Option<Capability>;
}

/// Concurrent map from full names to capabilities.
#[derive(Default)]
pub struct Registry {
    entries: DashMap<String, Capability>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its full name, returning the previous one.
    pub fn register<T>(&self, full_name: impl Into<String>, value: Arc<T>) -> Option<Capability>
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(full_name.into(), value)
    }

    /// Register a service; shorthand for `register("service:<name>", ..)`.
    pub fn register_service<T>(&self, name: &str, value: Arc<T>) -> Option<Capability>
    where
        T: Any + Send + Sync,
    {
        self.register(service_key(name), value)
    }

    pub fn unregister(&self, full_name: &str) -> Option<Capability> {
        self.entries.remove(full_name).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Owner for Registry {
    fn lookup(&self, full_name: &str) -> Option<Capability> {
        self.entries.get(full_name).map(|entry| Arc::clone(entry.value()))
    }
}

fn service_key(name: &str) -> String {
    format!("service:{name}")
}

/// Resolve the service `name` on `owner` and downcast it to `T`.
pub(crate) fn lookup_service<T>(owner: &dyn Owner, name: &str) -> Result<Arc<T>>
where
    T: Any + Send + Sync,
{
    let capability = owner
        .lookup(&service_key(name))
        .ok_or_else(|| ModifierError::ServiceNotFound {
            name: name.to_string(),
        })?;
    capability
        .downcast::<T>()
        .map_err(|_| ModifierError::ServiceType {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
}
