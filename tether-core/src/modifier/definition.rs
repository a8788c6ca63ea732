//! Modifier definitions.
//!
//! A definition is the reusable product of [`create_modifier`]: a blueprint
//! plus options. Each host resource gets its own
//! [`ModifierInstance`](super::ModifierInstance), and the blueprint runs once
//! per instance.

use std::fmt;
use std::sync::Arc;

use super::controller::ModifierInstance;
use super::options::ModifierOptions;
use super::registry::SetupContext;
use crate::error::BoxError;
use crate::owner::Owner;

/// Values a blueprint may return: `()` or a `Result`.
pub trait IntoSetupResult {
    fn into_setup_result(self) -> Result<(), BoxError>;
}

impl IntoSetupResult for () {
    fn into_setup_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoSetupResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_setup_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

type Blueprint<E> = dyn Fn(&mut SetupContext<'_, E>) -> Result<(), BoxError> + Send + Sync;

/// A modifier ready to be instantiated on host resources of type `E`.
pub struct ModifierDefinition<E> {
    blueprint: Arc<Blueprint<E>>,
    options: Arc<ModifierOptions>,
}

/// Define a modifier from a blueprint.
///
/// The blueprint runs once per host resource, during the first evaluation,
/// and declares effects through `cx.on().sync(..)`.
///
/// # Example
///
/// ```rust,ignore
/// let focus = create_modifier::<Element, _, _>(
///     |cx| {
///         cx.on().sync(|el, _args| {
///             el.focus();
///             Teardown::new(|| tracing::debug!("blurred"))
///         });
///     },
///     ModifierOptions::default(),
/// );
/// ```
pub fn create_modifier<E, F, R>(blueprint: F, options: ModifierOptions) -> ModifierDefinition<E>
where
    E: Send + Sync + 'static,
    F: Fn(&mut SetupContext<'_, E>) -> R + Send + Sync + 'static,
    R: IntoSetupResult,
{
    ModifierDefinition {
        blueprint: Arc::new(move |cx: &mut SetupContext<'_, E>| blueprint(cx).into_setup_result()),
        options: Arc::new(options),
    }
}

impl<E> ModifierDefinition<E>
where
    E: Send + Sync + 'static,
{
    /// Create an unbound instance whose services resolve through `owner`.
    pub fn instantiate(&self, owner: Arc<dyn Owner>) -> ModifierInstance<E> {
        ModifierInstance::new(self.clone(), owner)
    }

    pub(crate) fn run_blueprint(&self, cx: &mut SetupContext<'_, E>) -> Result<(), BoxError> {
        (self.blueprint)(cx)
    }
}

impl<E> ModifierDefinition<E> {
    pub fn options(&self) -> &ModifierOptions {
        &self.options
    }
}

impl<E> Clone for ModifierDefinition<E> {
    fn clone(&self) -> Self {
        Self {
            blueprint: Arc::clone(&self.blueprint),
            options: Arc::clone(&self.options),
        }
    }
}

impl<E> fmt::Debug for ModifierDefinition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierDefinition")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
