//! Error types.
//!
//! Everything a modifier can fail with is a [`ModifierError`]. Failures from
//! user code (blueprints, effect callbacks, teardowns) arrive as a
//! [`BoxError`] and are wrapped with the slot they came from.
//!
//! Misuse of the engine (forcing a destroyed instance, registering effects
//! after setup, cyclic memo reads) is not represented here; those are
//! programming errors and panic.

use thiserror::Error;

use crate::modifier::SlotIndex;

/// Type-erased error returned by user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = ModifierError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ModifierError {
    /// The host resource is not of the type the modifier was declared for.
    #[error("element must be an instance of {expected}")]
    Configuration { expected: String },

    /// The blueprint failed during the setup pass.
    #[error("modifier setup failed: {0}")]
    Setup(#[source] BoxError),

    #[error("on-sync effect {slot} failed: {source}")]
    Effect {
        slot: SlotIndex,
        #[source]
        source: BoxError,
    },

    #[error("teardown of on-sync effect {slot} failed: {source}")]
    Teardown {
        slot: SlotIndex,
        #[source]
        source: BoxError,
    },

    #[error("service `{name}` is not registered with the owner")]
    ServiceNotFound { name: String },

    #[error("service `{name}` is not a `{expected}`")]
    ServiceType { name: String, expected: &'static str },

    /// Binding failed earlier; the instance will not be evaluated again.
    #[error("modifier failed to bind and cannot be evaluated")]
    Poisoned,

    #[error(transparent)]
    Destroy(#[from] DestroyError),
}

/// One or more destructors failed while destroying an owner.
///
/// Every destructor still ran; `source` is the first failure.
#[derive(Debug, Error)]
#[error("{failures} destructor(s) failed; first failure: {source}")]
pub struct DestroyError {
    pub failures: usize,
    #[source]
    pub source: BoxError,
}
