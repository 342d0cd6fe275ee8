use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::AppResult;
use serde_json::Value;

use super::{unparseable, unsupported};

/// Variant of a date or time widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// Calendar date; `showTime` upgrades it to a date-time and
    /// `timeOnly` to a time.
    Date,
    /// Instant in UTC.
    DateTime,
    /// Wall-clock time.
    Time,
}

/// Date, date-time and time widget.
///
/// Dates travel as UTC midnight instants (`2024-01-05T00:00:00.000Z`),
/// date-times as RFC 3339 with milliseconds, times as `HH:MM:SS`.
pub struct TemporalWidget {
    core: WidgetCore,
    kind: TemporalKind,
}

impl TemporalWidget {
    /// Creates a temporal widget of the given kind.
    #[must_use]
    pub fn new(kind: TemporalKind) -> Self {
        Self {
            core: WidgetCore::default(),
            kind,
        }
    }

    /// Returns the kind after applying `showTime` and `timeOnly`.
    #[must_use]
    pub fn effective_kind(&self) -> TemporalKind {
        match self.kind {
            TemporalKind::Date if self.metadata().time_only() => TemporalKind::Time,
            TemporalKind::Date if self.metadata().show_time() => TemporalKind::DateTime,
            kind => kind,
        }
    }
}

impl FieldWidget for TemporalWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        match self.effective_kind() {
            TemporalKind::Date => "date",
            TemporalKind::DateTime => "datetime",
            TemporalKind::Time => "time",
        }
    }

    fn display_text(&self) -> String {
        match self.value() {
            NativeValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            NativeValue::DateTime(instant) => instant.format("%Y-%m-%d %H:%M").to_string(),
            NativeValue::Time(time) => time.format("%H:%M").to_string(),
            _ => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        let text = match value {
            NativeValue::Null => return Ok(Value::Null),
            NativeValue::Date(date) => format!("{}T00:00:00.000Z", date.format("%Y-%m-%d")),
            NativeValue::DateTime(instant) => instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            NativeValue::Time(time) => time.format("%H:%M:%S").to_string(),
            other => return Err(unsupported(self, other)),
        };
        Ok(Value::String(text))
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        let text = match value {
            Value::Null => return Ok(NativeValue::Null),
            Value::String(text) if text.trim().is_empty() => return Ok(NativeValue::Null),
            Value::String(text) => text.trim(),
            other => return Err(unparseable(self, other)),
        };

        let parsed = match self.effective_kind() {
            TemporalKind::Date => parse_instant(text)
                .map(|instant| instant.date_naive())
                .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
                .map(NativeValue::Date),
            TemporalKind::DateTime => parse_instant(text)
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc())
                })
                .map(NativeValue::DateTime),
            TemporalKind::Time => NaiveTime::parse_from_str(text, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .ok()
                .or_else(|| parse_instant(text).map(|instant| instant.time()))
                .map(NativeValue::Time),
        };
        parsed.ok_or_else(|| unparseable(self, value))
    }
}

fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}
