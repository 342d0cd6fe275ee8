//! Bundled field-type widgets.
//!
//! Each widget keeps its value in a [`NativeValue`] and owns the only
//! conversion code between that value and the transport JSON.

mod boolean;
mod choice;
mod file;
mod json;
mod number;
mod region;
mod temporal;
mod text;

pub use boolean::BooleanWidget;
pub use choice::{ChoiceKind, ChoiceWidget, MultiChoiceWidget};
pub use file::{FileReference, FileWidget, UploadGuard, UploadTracker};
pub use json::JsonWidget;
pub use number::{NumberKind, NumberWidget};
pub use region::RegionWidget;
pub use temporal::{TemporalKind, TemporalWidget};
pub use text::{TextKind, TextWidget};

use formweave_application::{FieldWidget, NativeValue};
use formweave_core::AppError;

fn unsupported(widget: &dyn FieldWidget, value: &NativeValue) -> AppError {
    AppError::Validation(format!(
        "{} widget '{}' cannot hold {value:?}",
        widget.input_kind(),
        widget.id()
    ))
}

fn unparseable(widget: &dyn FieldWidget, transport: &serde_json::Value) -> AppError {
    AppError::Validation(format!(
        "{} widget '{}' cannot read transport value {transport}",
        widget.input_kind(),
        widget.id()
    ))
}

#[cfg(test)]
mod tests;
