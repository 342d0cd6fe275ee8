use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::AppResult;
use serde_json::Value;

/// Header widget of a repeater or complex-type region.
///
/// Regions hold no value of their own; rows carry the data.
pub struct RegionWidget {
    core: WidgetCore,
    input_kind: &'static str,
}

impl RegionWidget {
    /// Creates a repeater region header.
    #[must_use]
    pub fn repeater() -> Self {
        Self {
            core: WidgetCore::default(),
            input_kind: "repeater",
        }
    }

    /// Creates a complex-type region header.
    #[must_use]
    pub fn complex() -> Self {
        Self {
            core: WidgetCore::default(),
            input_kind: "complex",
        }
    }
}

impl FieldWidget for RegionWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        self.input_kind
    }

    fn display_text(&self) -> String {
        self.label().to_owned()
    }

    fn to_transport(&self, _value: &NativeValue) -> AppResult<Value> {
        Ok(Value::Null)
    }

    fn from_transport(&self, _value: &Value) -> AppResult<NativeValue> {
        Ok(NativeValue::Null)
    }
}
