use formweave_core::{AppError, AppResult};
use serde_json::{Value, json};

use crate::field_registry::FieldTypeRegistry;
use crate::field_widget::{FieldWidget, NativeValue, WidgetCore};

#[derive(Default)]
pub(crate) struct StubTextWidget {
    core: WidgetCore,
}

impl FieldWidget for StubTextWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "text"
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::Text(text) => text.clone(),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Text(text) => Ok(Value::String(text.clone())),
            NativeValue::Json(value) => Ok(value.clone()),
            other => Err(AppError::Validation(format!("text widget cannot store {other:?}"))),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::String(text) => Ok(NativeValue::Text(text.clone())),
            Value::Number(number) => Ok(NativeValue::Text(number.to_string())),
            other => Ok(NativeValue::Json(other.clone())),
        }
    }
}

#[derive(Default)]
pub(crate) struct StubNumberWidget {
    core: WidgetCore,
}

impl FieldWidget for StubNumberWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "number"
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::Number(number) => number.to_string(),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Number(number) => Ok(json!(number)),
            other => Err(AppError::Validation(format!("not a number: {other:?}"))),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::Number(number) => number
                .as_f64()
                .map(NativeValue::Number)
                .ok_or_else(|| AppError::Validation("number out of range".to_owned())),
            other => Err(AppError::Validation(format!("not a number: {other}"))),
        }
    }
}

#[derive(Default)]
pub(crate) struct StubTagsWidget {
    core: WidgetCore,
}

impl FieldWidget for StubTagsWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "tags"
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::List(items) => items
                .iter()
                .filter_map(|item| match item {
                    NativeValue::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Array(Vec::new())),
            NativeValue::List(items) => items
                .iter()
                .map(|item| match item {
                    NativeValue::Text(text) => Ok(Value::String(text.clone())),
                    other => Err(AppError::Validation(format!("not a tag: {other:?}"))),
                })
                .collect::<AppResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(AppError::Validation(format!("not a tag list: {other:?}"))),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::List(Vec::new())),
            Value::Array(items) => Ok(NativeValue::List(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|text| NativeValue::Text(text.to_owned()))
                    .collect(),
            )),
            other => Err(AppError::Validation(format!("not a tag list: {other}"))),
        }
    }

    fn default_transport(&self) -> Value {
        Value::Array(Vec::new())
    }

    fn is_array(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub(crate) struct StubRegionWidget {
    core: WidgetCore,
}

impl FieldWidget for StubRegionWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "region"
    }

    fn display_text(&self) -> String {
        String::new()
    }

    fn to_transport(&self, _value: &NativeValue) -> AppResult<Value> {
        Ok(Value::Null)
    }

    fn from_transport(&self, _value: &Value) -> AppResult<NativeValue> {
        Ok(NativeValue::Null)
    }
}

pub(crate) fn stub_registry() -> FieldTypeRegistry {
    let mut registry = FieldTypeRegistry::new();
    registry.register("text", || Box::new(StubTextWidget::default()));
    registry.register("number", || Box::new(StubNumberWidget::default()));
    registry.register("tags", || Box::new(StubTagsWidget::default()));
    registry.register("repeater", || Box::new(StubRegionWidget::default()));
    registry.register("complex", || Box::new(StubRegionWidget::default()));
    registry
}
