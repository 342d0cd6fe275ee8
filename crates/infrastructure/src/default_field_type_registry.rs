use formweave_application::FieldTypeRegistry;

use crate::widgets::{
    BooleanWidget, ChoiceKind, ChoiceWidget, FileWidget, JsonWidget, MultiChoiceWidget, NumberKind,
    NumberWidget, RegionWidget, TemporalKind, TemporalWidget, TextKind, TextWidget,
};

/// Builds a registry holding every bundled widget.
///
/// Further field types can be registered on the returned value.
#[must_use]
pub fn default_field_type_registry() -> FieldTypeRegistry {
    let mut registry = FieldTypeRegistry::new();

    registry.register("text", || Box::new(TextWidget::new(TextKind::Text)));
    registry.register("textarea", || Box::new(TextWidget::new(TextKind::TextArea)));
    registry.register("email", || Box::new(TextWidget::new(TextKind::Email)));
    registry.register("password", || Box::new(TextWidget::new(TextKind::Password)));

    registry.register("number", || Box::new(NumberWidget::new(NumberKind::Number)));
    registry.register("currency", || Box::new(NumberWidget::new(NumberKind::Currency)));

    registry.register("checkbox", || Box::new(BooleanWidget::default()));
    registry.register("boolean", || Box::new(BooleanWidget::default()));

    registry.register("date", || Box::new(TemporalWidget::new(TemporalKind::Date)));
    registry.register("datetime", || Box::new(TemporalWidget::new(TemporalKind::DateTime)));
    registry.register("time", || Box::new(TemporalWidget::new(TemporalKind::Time)));

    registry.register("select", || Box::new(ChoiceWidget::new(ChoiceKind::Select)));
    registry.register("radio", || Box::new(ChoiceWidget::new(ChoiceKind::Radio)));
    registry.register("multiselect", || Box::new(MultiChoiceWidget::default()));

    registry.register("json", || Box::new(JsonWidget::default()));
    registry.register("file", || Box::new(FileWidget::default()));

    registry.register("repeater", || Box::new(RegionWidget::repeater()));
    registry.register("complex", || Box::new(RegionWidget::complex()));

    registry
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use formweave_application::{FormOrchestrator, NativeValue, SubmitOutcome};
    use formweave_domain::{FormStructure, ModelPath, RenderMode};
    use serde_json::json;

    use super::default_field_type_registry;
    use crate::InMemorySubmitSink;

    #[test]
    fn bundled_types_resolve_case_insensitively() {
        let registry = default_field_type_registry();
        for field_type in [
            "text", "textarea", "email", "password", "number", "currency", "checkbox", "boolean",
            "date", "datetime", "time", "select", "multiselect", "radio", "json", "file",
            "repeater", "complex",
        ] {
            assert!(registry.contains(field_type), "missing {field_type}");
        }
        assert!(registry.contains("DateTime"));
        assert!(!registry.contains("signature"));

        let widget = registry.resolve("MultiSelect").map(|factory| factory());
        assert!(widget.is_some_and(|widget| widget.is_array()));
    }

    #[tokio::test]
    async fn bundled_widgets_drive_a_form_to_submission() {
        let structure = FormStructure::from_value(json!({
            "structure": {
                "nodeType": "Root",
                "name": "profile",
                "children": [
                    {"nodeType": "Field", "name": "name", "fieldType": "text", "metadata": {"required": true}},
                    {"nodeType": "Field", "name": "birthday", "fieldType": "date"},
                    {"nodeType": "Field", "name": "newsletter", "fieldType": "checkbox"},
                    {"nodeType": "Field", "name": "country", "fieldType": "select", "metadata": {"optionsKey": "countries"}},
                    {"nodeType": "Field", "name": "tags", "fieldType": "multiselect"},
                    {"nodeType": "Field", "name": "attachment", "fieldType": "file"}
                ]
            },
            "inputOptions": {
                "countries": [
                    {"value": "gb", "label": "United Kingdom"},
                    {"value": "de", "label": "Germany"}
                ]
            },
            "model": {"name": "Ada", "birthday": "1815-12-10T00:00:00.000Z", "country": "gb"}
        }));
        assert!(structure.is_ok());
        let sink = Arc::new(InMemorySubmitSink::new());
        let mut orchestrator = FormOrchestrator::new(
            structure.unwrap_or_else(|_| unreachable!()),
            default_field_type_registry(),
            RenderMode::Edit,
            sink.clone(),
        );
        orchestrator.initialize();
        assert!(orchestrator.is_initialized());

        assert!(orchestrator.input("country", NativeValue::Json(json!("fr"))).is_ok());
        let country = ModelPath::parse("country").unwrap_or_else(|_| unreachable!());
        assert_eq!(
            orchestrator.submit().await,
            SubmitOutcome::Invalid {
                invalid_paths: vec![country]
            }
        );

        assert!(orchestrator.input("country", NativeValue::Json(json!("de"))).is_ok());
        assert!(orchestrator.submit().await.is_submitted());
        let submitted = sink.last().await.map(|document| document.values().clone());
        assert_eq!(
            submitted.map(serde_json::Value::Object),
            Some(json!({
                "name": "Ada",
                "birthday": "1815-12-10T00:00:00.000Z",
                "newsletter": false,
                "country": "de",
                "tags": [],
                "attachment": null
            }))
        );

        orchestrator.set_mode(RenderMode::View);
        let rendered = orchestrator.render();
        assert!(rendered.find_field("country").is_some_and(|field| field.text == "Germany"));
        assert!(rendered.find_field("birthday").is_some_and(|field| field.text == "1815-12-10"));
    }
}
