use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::{AppError, AppResult};
use serde_json::Value;

use super::unsupported;

/// Raw JSON editor; typed text is parsed as JSON.
#[derive(Default)]
pub struct JsonWidget {
    core: WidgetCore,
}

impl FieldWidget for JsonWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "json"
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::Json(value) => value.to_string(),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Json(value) => Ok(value.clone()),
            NativeValue::Text(text) if text.trim().is_empty() => Ok(Value::Null),
            NativeValue::Text(text) => serde_json::from_str(text).map_err(|error| {
                AppError::Validation(format!("'{}' is not valid JSON: {error}", self.id()))
            }),
            other => Err(unsupported(self, other)),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            other => Ok(NativeValue::Json(other.clone())),
        }
    }
}
