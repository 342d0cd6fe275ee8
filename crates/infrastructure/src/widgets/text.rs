use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::AppResult;
use serde_json::Value;

use super::{unparseable, unsupported};

/// Variant of a free-text widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Single-line input.
    Text,
    /// Multi-line input.
    TextArea,
    /// Email address input.
    Email,
    /// Masked input.
    Password,
}

/// Free-text widget storing strings.
pub struct TextWidget {
    core: WidgetCore,
    kind: TextKind,
}

impl TextWidget {
    /// Creates a text widget of the given kind.
    #[must_use]
    pub fn new(kind: TextKind) -> Self {
        Self {
            core: WidgetCore::default(),
            kind,
        }
    }
}

impl FieldWidget for TextWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        match self.kind {
            TextKind::Text => "text",
            TextKind::TextArea => "textarea",
            TextKind::Email => "email",
            TextKind::Password => "password",
        }
    }

    fn display_text(&self) -> String {
        let NativeValue::Text(text) = self.value() else {
            return String::new();
        };
        match self.kind {
            TextKind::Password => "•".repeat(text.chars().count()),
            _ => text.clone(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Text(text) => Ok(Value::String(text.clone())),
            other => Err(unsupported(self, other)),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::String(text) => Ok(NativeValue::Text(text.clone())),
            Value::Number(number) => Ok(NativeValue::Text(number.to_string())),
            Value::Bool(flag) => Ok(NativeValue::Text(flag.to_string())),
            other => Err(unparseable(self, other)),
        }
    }
}
