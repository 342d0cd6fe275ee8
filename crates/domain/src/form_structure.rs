use std::collections::BTreeMap;

use formweave_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field_metadata::{FieldMetadata, InputOption};
use crate::node::{Node, NodeType};

/// Root document delivered once per form load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStructure {
    structure: Node,
    #[serde(default)]
    input_options: BTreeMap<String, Vec<InputOption>>,
    #[serde(default)]
    foreign_types: BTreeMap<String, Node>,
    #[serde(default)]
    model: Value,
}

impl FormStructure {
    /// Creates a validated form structure.
    pub fn new(
        structure: Node,
        input_options: BTreeMap<String, Vec<InputOption>>,
        foreign_types: BTreeMap<String, Node>,
        model: Value,
    ) -> AppResult<Self> {
        if structure.node_type() != NodeType::Root {
            return Err(AppError::Validation(format!(
                "form structure must start with a Root node, found '{}'",
                structure.node_type().as_str()
            )));
        }

        let model = match model {
            Value::Null => Value::Object(Map::new()),
            Value::Object(object) => Value::Object(object),
            _ => {
                return Err(AppError::Validation(
                    "form model must be a JSON object".to_owned(),
                ));
            }
        };

        Ok(Self {
            structure,
            input_options,
            foreign_types,
            model,
        })
    }

    /// Parses and validates a form structure document.
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let parsed: Self = serde_json::from_str(raw).map_err(|error| {
            AppError::Validation(format!("invalid form structure document: {error}"))
        })?;

        Self::new(
            parsed.structure,
            parsed.input_options,
            parsed.foreign_types,
            parsed.model,
        )
    }

    /// Validates a form structure given as a JSON value.
    pub fn from_value(value: Value) -> AppResult<Self> {
        let parsed: Self = serde_json::from_value(value).map_err(|error| {
            AppError::Validation(format!("invalid form structure document: {error}"))
        })?;

        Self::new(
            parsed.structure,
            parsed.input_options,
            parsed.foreign_types,
            parsed.model,
        )
    }

    /// Returns the root node.
    #[must_use]
    pub fn structure(&self) -> &Node {
        &self.structure
    }

    /// Returns every published option list.
    #[must_use]
    pub fn input_options(&self) -> &BTreeMap<String, Vec<InputOption>> {
        &self.input_options
    }

    /// Returns every published foreign type.
    #[must_use]
    pub fn foreign_types(&self) -> &BTreeMap<String, Node> {
        &self.foreign_types
    }

    /// Returns one foreign type by key.
    #[must_use]
    pub fn foreign_type(&self, key: &str) -> Option<&Node> {
        self.foreign_types.get(key)
    }

    /// Returns the seed document.
    #[must_use]
    pub fn model(&self) -> &Value {
        &self.model
    }

    /// Resolves the options of a choice field: the referenced
    /// `inputOptions` list when `optionsKey` is set and known, otherwise the
    /// inline list.
    #[must_use]
    pub fn resolve_options(&self, metadata: &FieldMetadata) -> Vec<InputOption> {
        metadata
            .options_key()
            .and_then(|key| self.input_options.get(key))
            .cloned()
            .unwrap_or_else(|| metadata.inline_options())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::FormStructure;
    use crate::field_metadata::FieldMetadata;

    #[test]
    fn structure_must_start_with_root() {
        let result = FormStructure::from_value(json!({
            "structure": {"nodeType": "Tab", "name": "general"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn model_defaults_to_empty_object_and_rejects_scalars() {
        let empty = FormStructure::from_value(json!({
            "structure": {"nodeType": "Root", "name": "root"}
        }));
        assert!(empty.is_ok());
        assert_eq!(empty.unwrap_or_else(|_| unreachable!()).model(), &json!({}));

        let scalar = FormStructure::from_value(json!({
            "structure": {"nodeType": "Root", "name": "root"},
            "model": 4
        }));
        assert!(scalar.is_err());
    }

    #[test]
    fn options_key_takes_precedence_over_inline_options() {
        let structure = FormStructure::from_json(
            r#"{
                "structure": {"nodeType": "Root", "name": "root"},
                "inputOptions": {"countries": [{"value": "de", "label": "Germany"}]},
                "foreignTypes": {"address": {"nodeType": "Container", "name": "address"}}
            }"#,
        );
        assert!(structure.is_ok());
        let structure = structure.unwrap_or_else(|_| unreachable!());

        let keyed = FieldMetadata::default()
            .with_attribute("optionsKey", json!("countries"))
            .with_attribute("options", json!(["ignored"]));
        let options = structure.resolve_options(&keyed);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].label(), "Germany");

        let unknown_key = FieldMetadata::default()
            .with_attribute("optionsKey", json!("missing"))
            .with_attribute("options", json!(["fallback"]));
        assert_eq!(structure.resolve_options(&unknown_key)[0].value(), &json!("fallback"));

        assert!(structure.foreign_type("address").is_some());
    }
}
