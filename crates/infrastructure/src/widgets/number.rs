use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::{AppError, AppResult};
use serde_json::{Number, Value};

use super::{unparseable, unsupported};

/// Variant of a numeric widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Plain number.
    Number,
    /// Monetary amount, displayed with two decimals by default.
    Currency,
}

/// Numeric widget storing JSON numbers.
///
/// Integral values travel as JSON integers, everything else as floats.
/// Numeric strings are accepted on input.
pub struct NumberWidget {
    core: WidgetCore,
    kind: NumberKind,
}

impl NumberWidget {
    /// Creates a numeric widget of the given kind.
    #[must_use]
    pub fn new(kind: NumberKind) -> Self {
        Self {
            core: WidgetCore::default(),
            kind,
        }
    }

    fn display_places(&self) -> Option<usize> {
        let declared = self.metadata().decimal_places().map(|places| places as usize);
        match self.kind {
            NumberKind::Number => declared,
            NumberKind::Currency => declared.or(Some(2)),
        }
    }
}

impl FieldWidget for NumberWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        match self.kind {
            NumberKind::Number => "number",
            NumberKind::Currency => "currency",
        }
    }

    fn display_text(&self) -> String {
        let NativeValue::Number(number) = self.value() else {
            return String::new();
        };
        let amount = match self.display_places() {
            Some(places) => format!("{number:.places$}"),
            None => number.to_string(),
        };
        match self
            .metadata()
            .attribute("currency")
            .and_then(Value::as_str)
            .filter(|_| self.kind == NumberKind::Currency)
        {
            Some(code) => format!("{amount} {code}"),
            None => amount,
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Number(number) => number_to_transport(*number).ok_or_else(|| {
                AppError::Validation(format!("'{}' cannot store non-finite number {number}", self.id()))
            }),
            NativeValue::Text(text) if text.trim().is_empty() => Ok(Value::Null),
            NativeValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(number_to_transport)
                .ok_or_else(|| unsupported(self, value)),
            other => Err(unsupported(self, other)),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::Number(number) => number
                .as_f64()
                .map(NativeValue::Number)
                .ok_or_else(|| unparseable(self, value)),
            Value::String(text) if text.trim().is_empty() => Ok(NativeValue::Null),
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .map(NativeValue::Number)
                .map_err(|_| unparseable(self, value)),
            other => Err(unparseable(self, other)),
        }
    }
}

fn number_to_transport(number: f64) -> Option<Value> {
    if !number.is_finite() {
        return None;
    }
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::Number(Number::from(number as i64)));
    }
    Number::from_f64(number).map(Value::Number)
}
