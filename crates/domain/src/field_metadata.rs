use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Layout width hint for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldWidth {
    /// Number of grid columns.
    Columns(u32),
    /// Free-form CSS-like width such as `50%`.
    Css(String),
}

/// One selectable option published in `inputOptions` or inline metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputOption {
    value: Value,
    #[serde(default)]
    label: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl InputOption {
    /// Creates an option with a value and a label.
    #[must_use]
    pub fn new(value: Value, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
            extra: Map::new(),
        }
    }

    /// Returns the transport value of the option.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the display label, falling back to the value text.
    #[must_use]
    pub fn label(&self) -> String {
        if !self.label.trim().is_empty() {
            return self.label.clone();
        }

        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// Returns additional option attributes.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Per-field capability record.
///
/// Common attributes are typed; every other key the schema producer sends
/// is preserved in [`FieldMetadata::extra`] and read through accessors, so
/// the backend and the widget set can evolve independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    placeholder: Option<String>,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    tooltip: Option<String>,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    width: Option<FieldWidth>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn default_visible() -> bool {
    true
}

impl Default for FieldMetadata {
    fn default() -> Self {
        Self {
            required: false,
            placeholder: None,
            read_only: false,
            tooltip: None,
            visible: true,
            width: None,
            extra: Map::new(),
        }
    }
}

impl FieldMetadata {
    /// Returns a copy with the required flag set.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Returns a copy with the read-only flag set.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns a copy with the static visibility flag set.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Returns a copy with one type-specific attribute set.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns whether a value is required.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns placeholder text.
    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// Returns whether the field is read-only.
    #[must_use]
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Returns tooltip text.
    #[must_use]
    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// Returns the static visibility flag.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Returns the layout width hint.
    #[must_use]
    pub fn width(&self) -> Option<&FieldWidth> {
        self.width.as_ref()
    }

    /// Returns all type-specific attributes.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Returns one type-specific attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.extra.get(key).filter(|value| !value.is_null())
    }

    /// Returns the numeric lower bound.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.number_attribute("min")
    }

    /// Returns the numeric upper bound.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.number_attribute("max")
    }

    /// Returns the allowed number of decimal places.
    #[must_use]
    pub fn decimal_places(&self) -> Option<u32> {
        self.number_attribute("decimalPlaces")
            .filter(|places| *places >= 0.0)
            .map(|places| places as u32)
    }

    /// Returns the minimum text length.
    #[must_use]
    pub fn min_length(&self) -> Option<usize> {
        self.number_attribute("minLength")
            .filter(|length| *length >= 0.0)
            .map(|length| length as usize)
    }

    /// Returns the maximum text length.
    #[must_use]
    pub fn max_length(&self) -> Option<usize> {
        self.number_attribute("maxLength")
            .filter(|length| *length >= 0.0)
            .map(|length| length as usize)
    }

    /// Returns the text pattern.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.attribute("pattern")
            .and_then(Value::as_str)
            .filter(|pattern| !pattern.is_empty())
    }

    /// Returns the key into the form's `inputOptions` map.
    #[must_use]
    pub fn options_key(&self) -> Option<&str> {
        self.attribute("optionsKey")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Returns options declared inline; malformed entries are skipped.
    #[must_use]
    pub fn inline_options(&self) -> Vec<InputOption> {
        self.attribute("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| match option {
                        Value::Object(_) => serde_json::from_value(option.clone()).ok(),
                        Value::String(text) => {
                            Some(InputOption::new(Value::String(text.clone()), text.clone()))
                        }
                        Value::Number(_) | Value::Bool(_) => {
                            Some(InputOption::new(option.clone(), option.to_string()))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns whether a date field also captures a time.
    #[must_use]
    pub fn show_time(&self) -> bool {
        self.bool_attribute("showTime")
    }

    /// Returns whether a date field captures only a time.
    #[must_use]
    pub fn time_only(&self) -> bool {
        self.bool_attribute("timeOnly")
    }

    /// Returns whether a choice field accepts several values.
    #[must_use]
    pub fn multiple(&self) -> bool {
        self.bool_attribute("multiple")
    }

    /// Returns the schema-declared default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.attribute("defaultValue")
    }

    fn bool_attribute(&self, key: &str) -> bool {
        match self.attribute(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn number_attribute(&self, key: &str) -> Option<f64> {
        match self.attribute(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FieldMetadata, FieldWidth};

    #[test]
    fn metadata_tolerates_unknown_keys_and_reads_typed_attributes() {
        let metadata: Result<FieldMetadata, _> = serde_json::from_value(json!({
            "required": true,
            "readOnly": false,
            "width": "50%",
            "min": 1,
            "max": "10",
            "decimalPlaces": 2,
            "maxLength": 40,
            "showTime": true,
            "someFutureFlag": {"nested": true}
        }));
        assert!(metadata.is_ok());
        let metadata = metadata.unwrap_or_else(|_| unreachable!());

        assert!(metadata.required());
        assert!(metadata.visible());
        assert_eq!(metadata.width(), Some(&FieldWidth::Css("50%".to_owned())));
        assert_eq!(metadata.min(), Some(1.0));
        assert_eq!(metadata.max(), Some(10.0));
        assert_eq!(metadata.decimal_places(), Some(2));
        assert_eq!(metadata.max_length(), Some(40));
        assert!(metadata.show_time());
        assert!(!metadata.time_only());
        assert!(metadata.attribute("someFutureFlag").is_some());
    }

    #[test]
    fn inline_options_accept_objects_and_scalars() {
        let metadata = FieldMetadata::default().with_attribute(
            "options",
            json!([{"value": "a", "label": "Alpha"}, "b", 3, null]),
        );

        let options = metadata.inline_options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].label(), "Alpha");
        assert_eq!(options[1].value(), &json!("b"));
        assert_eq!(options[2].label(), "3");
    }

    #[test]
    fn metadata_round_trips_extra_keys() {
        let metadata = FieldMetadata::default()
            .with_required(true)
            .with_attribute("pattern", json!("^[A-Z]+$"));

        let serialized = serde_json::to_value(&metadata);
        assert!(serialized.is_ok());
        let serialized = serialized.unwrap_or_else(|_| unreachable!());
        assert_eq!(serialized["pattern"], json!("^[A-Z]+$"));
        assert_eq!(serialized["required"], json!(true));
    }
}
