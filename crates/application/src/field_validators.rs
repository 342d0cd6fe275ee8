use formweave_domain::{FieldMetadata, InputOption};
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Per-path constraint checked by the model store.
#[derive(Debug, Clone)]
pub enum FieldValidator {
    /// Value must be present and non-empty.
    Required,
    /// Number must be greater than or equal to the bound.
    Min(f64),
    /// Number must be less than or equal to the bound.
    Max(f64),
    /// Number must not carry more decimal places.
    DecimalPlaces(u32),
    /// Text must have at least this many characters.
    MinLength(usize),
    /// Text must have at most this many characters.
    MaxLength(usize),
    /// Text must match the full pattern.
    Pattern(Regex),
    /// Text must look like an email address.
    Email,
    /// Value, or every array element, must be one of the options.
    OneOf(Vec<Value>),
}

impl FieldValidator {
    /// Checks one transport value; returns the failure message.
    ///
    /// Every validator except [`FieldValidator::Required`] accepts empty
    /// values.
    #[must_use]
    pub fn check(&self, value: &Value) -> Option<String> {
        if is_blank(value) {
            return matches!(self, Self::Required).then(|| "is required".to_owned());
        }

        match self {
            Self::Required => None,
            Self::Min(bound) => number_of(value)
                .filter(|number| number < bound)
                .map(|_| format!("must be at least {bound}")),
            Self::Max(bound) => number_of(value)
                .filter(|number| number > bound)
                .map(|_| format!("must be at most {bound}")),
            Self::DecimalPlaces(places) => number_text(value)
                .filter(|text| decimal_places(text) > *places as usize)
                .map(|_| format!("must have at most {places} decimal places")),
            Self::MinLength(length) => value
                .as_str()
                .filter(|text| text.chars().count() < *length)
                .map(|_| format!("must be at least {length} characters")),
            Self::MaxLength(length) => value
                .as_str()
                .filter(|text| text.chars().count() > *length)
                .map(|_| format!("must be at most {length} characters")),
            Self::Pattern(pattern) => value
                .as_str()
                .filter(|text| !pattern.is_match(text))
                .map(|_| "has an invalid format".to_owned()),
            Self::Email => value
                .as_str()
                .filter(|text| !looks_like_email(text))
                .map(|_| "must be a valid email address".to_owned()),
            Self::OneOf(allowed) => {
                let candidates: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                candidates
                    .iter()
                    .any(|candidate| !allowed.contains(candidate))
                    .then(|| "must be one of the available options".to_owned())
            }
        }
    }
}

/// Runs every validator and collects failure messages.
#[must_use]
pub fn run_validators(validators: &[FieldValidator], value: &Value) -> Vec<String> {
    validators
        .iter()
        .filter_map(|validator| validator.check(value))
        .collect()
}

/// Derives the validators of one field from its type and metadata.
///
/// Invalid patterns are a schema defect: they are logged and skipped so one
/// misconfigured field cannot block the whole form.
#[must_use]
pub fn derive_validators(
    field_type: &str,
    metadata: &FieldMetadata,
    options: &[InputOption],
) -> Vec<FieldValidator> {
    let field_type = field_type.trim().to_ascii_lowercase();
    let mut validators = Vec::new();

    if metadata.required() {
        validators.push(FieldValidator::Required);
    }
    if let Some(min) = metadata.min() {
        validators.push(FieldValidator::Min(min));
    }
    if let Some(max) = metadata.max() {
        validators.push(FieldValidator::Max(max));
    }
    if let Some(places) = metadata.decimal_places() {
        validators.push(FieldValidator::DecimalPlaces(places));
    }
    if let Some(length) = metadata.min_length() {
        validators.push(FieldValidator::MinLength(length));
    }
    if let Some(length) = metadata.max_length() {
        validators.push(FieldValidator::MaxLength(length));
    }
    if let Some(pattern) = metadata.pattern() {
        match Regex::new(format!("^(?:{pattern})$").as_str()) {
            Ok(regex) => validators.push(FieldValidator::Pattern(regex)),
            Err(error) => warn!(
                field_type = %field_type,
                pattern = %pattern,
                error = %error,
                "ignoring invalid field pattern"
            ),
        }
    }
    if field_type == "email" {
        validators.push(FieldValidator::Email);
    }
    if matches!(
        field_type.as_str(),
        "select" | "dropdown" | "radio" | "multiselect"
    ) && !options.is_empty()
    {
        validators.push(FieldValidator::OneOf(
            options.iter().map(|option| option.value().clone()).collect(),
        ));
    }

    validators
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn number_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) if text.trim().parse::<f64>().is_ok() => Some(text.trim().to_owned()),
        _ => None,
    }
}

fn decimal_places(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
    mantissa
        .split_once('.')
        .map(|(_, fraction)| fraction.trim_end_matches('0').len())
        .unwrap_or(0)
}

fn looks_like_email(text: &str) -> bool {
    let Some((local, domain)) = text.trim().split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
        && !text.chars().any(char::is_whitespace)
}
