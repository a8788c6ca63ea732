//! Modifier configuration.

use std::any::type_name;

/// Options fixed when a modifier is defined.
#[derive(Debug, Clone, Default)]
pub struct ModifierOptions {
    positional: Vec<String>,
    element_name: Option<String>,
}

impl ModifierOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the named keys that positional arguments map to, in order.
    ///
    /// # Panics
    ///
    /// Panics if a name appears twice.
    pub fn positional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for (i, name) in names.iter().enumerate() {
            assert!(
                !names[..i].contains(name),
                "positional name `{name}` is declared more than once"
            );
        }
        self.positional = names;
        self
    }

    /// Name used for the host type in configuration errors.
    pub fn element_name(mut self, name: impl Into<String>) -> Self {
        self.element_name = Some(name.into());
        self
    }

    pub fn positional_names(&self) -> &[String] {
        &self.positional
    }

    /// The configured element name, or the Rust type name of `E`.
    pub fn describe_element<E>(&self) -> String {
        self.element_name
            .clone()
            .unwrap_or_else(|| type_name::<E>().to_string())
    }
}
