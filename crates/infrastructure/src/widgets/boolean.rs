use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::AppResult;
use serde_json::Value;

use super::{unparseable, unsupported};

/// Checkbox widget storing JSON booleans; defaults to `false`.
#[derive(Default)]
pub struct BooleanWidget {
    core: WidgetCore,
}

impl FieldWidget for BooleanWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "checkbox"
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::Boolean(true) => "Yes".to_owned(),
            NativeValue::Boolean(false) => "No".to_owned(),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Boolean(flag) => Ok(Value::Bool(*flag)),
            other => Err(unsupported(self, other)),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::Bool(flag) => Ok(NativeValue::Boolean(*flag)),
            Value::String(text) if text.eq_ignore_ascii_case("true") => Ok(NativeValue::Boolean(true)),
            Value::String(text) if text.eq_ignore_ascii_case("false") => {
                Ok(NativeValue::Boolean(false))
            }
            Value::Number(number) if number.as_f64() == Some(0.0) => Ok(NativeValue::Boolean(false)),
            Value::Number(number) if number.as_f64() == Some(1.0) => Ok(NativeValue::Boolean(true)),
            other => Err(unparseable(self, other)),
        }
    }

    fn default_transport(&self) -> Value {
        Value::Bool(false)
    }
}
