use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::field_widget::FieldWidget;

/// Constructor of one widget instance.
pub type WidgetFactory = Arc<dyn Fn() -> Box<dyn FieldWidget> + Send + Sync>;

/// Registry mapping field-type identifiers to widget factories.
///
/// Keys are matched case-insensitively. Registering an existing key
/// replaces the previous factory.
#[derive(Clone, Default)]
pub struct FieldTypeRegistry {
    factories: BTreeMap<String, WidgetFactory>,
}

impl FieldTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a widget factory for `field_type`.
    pub fn register<F>(&mut self, field_type: impl AsRef<str>, factory: F)
    where
        F: Fn() -> Box<dyn FieldWidget> + Send + Sync + 'static,
    {
        let key = normalize_key(field_type.as_ref());
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            debug!(field_type = %key, "replaced widget factory");
        }
    }

    /// Resolves the factory registered for `field_type`.
    #[must_use]
    pub fn resolve(&self, field_type: &str) -> Option<WidgetFactory> {
        self.factories.get(&normalize_key(field_type)).cloned()
    }

    /// Returns whether `field_type` is registered.
    #[must_use]
    pub fn contains(&self, field_type: &str) -> bool {
        self.factories.contains_key(&normalize_key(field_type))
    }

    /// Returns registered field types in sorted order.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

fn normalize_key(field_type: &str) -> String {
    field_type.trim().to_ascii_lowercase()
}
