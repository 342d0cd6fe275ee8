use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use formweave_core::{AppError, AppResult};
use formweave_domain::RenderMode;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Where the form structure document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureLocation {
    File(PathBuf),
    Http(Url),
}

/// One scripted value edit applied after initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueEdit {
    pub target: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct SubmitEndpointConfig {
    pub url: Url,
    pub max_attempts: u8,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub structure: StructureLocation,
    pub render_mode: RenderMode,
    pub submit_endpoint: Option<SubmitEndpointConfig>,
    pub http_timeout_seconds: u64,
    pub value_edits: Vec<ValueEdit>,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        let structure = match (
            optional_non_empty_env("FORM_STRUCTURE_PATH"),
            optional_non_empty_env("FORM_STRUCTURE_URL"),
        ) {
            (Some(path), None) => StructureLocation::File(PathBuf::from(path)),
            (None, Some(url)) => StructureLocation::Http(parse_url("FORM_STRUCTURE_URL", &url)?),
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "set either FORM_STRUCTURE_PATH or FORM_STRUCTURE_URL, not both".to_owned(),
                ));
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "FORM_STRUCTURE_PATH or FORM_STRUCTURE_URL is required".to_owned(),
                ));
            }
        };

        let render_mode = optional_non_empty_env("FORM_RENDER_MODE")
            .map(|value| RenderMode::from_str(&value))
            .transpose()?
            .unwrap_or_default();

        let submit_endpoint = optional_non_empty_env("FORM_SUBMIT_URL")
            .map(|value| -> AppResult<SubmitEndpointConfig> {
                let max_attempts = parse_env_u8("FORM_SUBMIT_MAX_ATTEMPTS", 3)?;
                if max_attempts == 0 {
                    return Err(AppError::Validation(
                        "FORM_SUBMIT_MAX_ATTEMPTS must be greater than zero".to_owned(),
                    ));
                }
                Ok(SubmitEndpointConfig {
                    url: parse_url("FORM_SUBMIT_URL", &value)?,
                    max_attempts,
                    retry_backoff_ms: parse_env_u64("FORM_SUBMIT_RETRY_BACKOFF_MS", 250)?,
                })
            })
            .transpose()?;

        let http_timeout_seconds = parse_env_u64("FORM_HTTP_TIMEOUT_SECONDS", 15)?;
        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "FORM_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let value_edits = optional_non_empty_env("FORM_VALUE_EDITS")
            .map(|raw| parse_value_edits(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            structure,
            render_mode,
            submit_endpoint,
            http_timeout_seconds,
            value_edits,
        })
    }
}

/// Parses `target=json;target=json`.
///
/// A value that is not valid JSON is taken as a plain string, so
/// `name=Ada` and `name="Ada"` are equivalent.
pub fn parse_value_edits(raw: &str) -> AppResult<Vec<ValueEdit>> {
    raw.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (target, value) = segment.split_once('=').ok_or_else(|| {
                AppError::Validation(format!(
                    "FORM_VALUE_EDITS entry '{segment}' must look like target=value"
                ))
            })?;
            let target = target.trim();
            if target.is_empty() {
                return Err(AppError::Validation(format!(
                    "FORM_VALUE_EDITS entry '{segment}' has an empty target"
                )));
            }
            let value = value.trim();
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| Value::String(value.to_owned()));
            Ok(ValueEdit {
                target: target.to_owned(),
                value,
            })
        })
        .collect()
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_url(name: &str, value: &str) -> AppResult<Url> {
    Url::parse(value).map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
}

fn parse_env_u8(name: &str, default: u8) -> AppResult<u8> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u8>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ValueEdit, parse_value_edits};

    #[test]
    fn value_edits_parse_json_and_fall_back_to_text() {
        let edits = parse_value_edits(r#"name=Ada; age=36 ;tags=["a","b"];;quoted="x=y""#);
        assert!(edits.is_ok());
        assert_eq!(
            edits.unwrap_or_else(|_| unreachable!()),
            vec![
                ValueEdit {
                    target: "name".to_owned(),
                    value: json!("Ada"),
                },
                ValueEdit {
                    target: "age".to_owned(),
                    value: json!(36),
                },
                ValueEdit {
                    target: "tags".to_owned(),
                    value: json!(["a", "b"]),
                },
                ValueEdit {
                    target: "quoted".to_owned(),
                    value: json!("x=y"),
                },
            ]
        );
    }

    #[test]
    fn value_edits_reject_entries_without_target() {
        assert!(parse_value_edits("name").is_err());
        assert!(parse_value_edits("=5").is_err());
        assert!(matches!(parse_value_edits("  "), Ok(edits) if edits.is_empty()));
    }
}
