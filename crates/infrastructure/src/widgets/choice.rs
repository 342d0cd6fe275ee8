use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::AppResult;
use serde_json::Value;

use super::{unparseable, unsupported};

/// Variant of a single-choice widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    /// Dropdown.
    Select,
    /// Radio group.
    Radio,
}

/// Single-choice widget storing the selected option value.
pub struct ChoiceWidget {
    core: WidgetCore,
    kind: ChoiceKind,
}

impl ChoiceWidget {
    /// Creates a single-choice widget of the given kind.
    #[must_use]
    pub fn new(kind: ChoiceKind) -> Self {
        Self {
            core: WidgetCore::default(),
            kind,
        }
    }
}

impl FieldWidget for ChoiceWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        match self.kind {
            ChoiceKind::Select => "select",
            ChoiceKind::Radio => "radio",
        }
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::Json(selected) => option_label(&self.core, selected),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        scalar_to_transport(value).ok_or_else(|| unsupported(self, value))
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(NativeValue::Json(value.clone())),
            other => Err(unparseable(self, other)),
        }
    }
}

/// Multi-choice widget storing an array of option values.
#[derive(Default)]
pub struct MultiChoiceWidget {
    core: WidgetCore,
}

impl FieldWidget for MultiChoiceWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "multiselect"
    }

    fn display_text(&self) -> String {
        let NativeValue::List(selected) = self.value() else {
            return String::new();
        };
        selected
            .iter()
            .filter_map(|item| match item {
                NativeValue::Json(value) => Some(option_label(&self.core, value)),
                NativeValue::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Array(Vec::new())),
            NativeValue::List(items) => items
                .iter()
                .map(|item| scalar_to_transport(item).ok_or_else(|| unsupported(self, item)))
                .collect::<AppResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(unsupported(self, other)),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::List(Vec::new())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                        Ok(NativeValue::Json(item.clone()))
                    }
                    other => Err(unparseable(self, other)),
                })
                .collect::<AppResult<Vec<_>>>()
                .map(NativeValue::List),
            other => Err(unparseable(self, other)),
        }
    }

    fn default_transport(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn is_array(&self) -> bool {
        true
    }
}

fn scalar_to_transport(value: &NativeValue) -> Option<Value> {
    match value {
        NativeValue::Null => Some(Value::Null),
        NativeValue::Text(text) => Some(Value::String(text.clone())),
        NativeValue::Json(value) if !value.is_array() && !value.is_object() => Some(value.clone()),
        _ => None,
    }
}

fn option_label(core: &WidgetCore, selected: &Value) -> String {
    core.options()
        .iter()
        .find(|option| option.value() == selected)
        .map(|option| option.label())
        .unwrap_or_else(|| match selected {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
}
