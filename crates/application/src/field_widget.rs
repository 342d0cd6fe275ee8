use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use formweave_core::AppResult;
use formweave_domain::{FieldMetadata, InputOption, RenderMode};
use serde_json::Value;

use crate::render_model::RenderedField;

/// In-memory representation of a field value inside a widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NativeValue {
    /// No value.
    #[default]
    Null,
    /// Free text.
    Text(String),
    /// Floating point number.
    Number(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Instant in UTC.
    DateTime(DateTime<Utc>),
    /// Wall-clock time.
    Time(NaiveTime),
    /// Ordered list of values.
    List(Vec<NativeValue>),
    /// Opaque JSON payload.
    Json(Value),
}

impl NativeValue {
    /// Returns whether the value is [`NativeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Values copied onto a widget when it is loaded by a field mount.
#[derive(Debug, Clone)]
pub struct WidgetBinding {
    /// Flat field identifier.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Field metadata.
    pub metadata: FieldMetadata,
    /// Resolved options for choice widgets.
    pub options: Vec<InputOption>,
}

/// State shared by every widget implementation.
#[derive(Debug, Clone, Default)]
pub struct WidgetCore {
    id: String,
    label: String,
    metadata: FieldMetadata,
    options: Vec<InputOption>,
    value: NativeValue,
    changes: VecDeque<NativeValue>,
    disposed: bool,
}

impl WidgetCore {
    /// Returns the flat field identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns field metadata.
    #[must_use]
    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    /// Returns resolved choice options.
    #[must_use]
    pub fn options(&self) -> &[InputOption] {
        &self.options
    }

    /// Returns the current native value.
    #[must_use]
    pub fn value(&self) -> &NativeValue {
        &self.value
    }
}

/// Capability contract every field-type implementation satisfies.
///
/// The core only talks to widgets through this trait: identity and
/// metadata, the current value, the change outbox, the three render
/// surfaces, and the two transport conversions.
pub trait FieldWidget: Send {
    /// Returns shared widget state.
    fn core(&self) -> &WidgetCore;

    /// Returns shared widget state mutably.
    fn core_mut(&mut self) -> &mut WidgetCore;

    /// Short descriptor of the input control drawn in edit mode.
    fn input_kind(&self) -> &'static str;

    /// Human-readable rendering of the current value.
    fn display_text(&self) -> String;

    /// Converts a native value to its transport representation.
    fn to_transport(&self, value: &NativeValue) -> AppResult<Value>;

    /// Converts a transport value to the native representation.
    fn from_transport(&self, value: &Value) -> AppResult<NativeValue>;

    /// Built-in default in transport form.
    fn default_transport(&self) -> Value {
        Value::Null
    }

    /// Whether values are stored as arrays.
    fn is_array(&self) -> bool {
        false
    }

    /// Returns the flat field identifier.
    fn id(&self) -> &str {
        self.core().id()
    }

    /// Returns the display label.
    fn label(&self) -> &str {
        self.core().label()
    }

    /// Returns field metadata.
    fn metadata(&self) -> &FieldMetadata {
        self.core().metadata()
    }

    /// Returns the current native value.
    fn value(&self) -> &NativeValue {
        self.core().value()
    }

    /// Copies identity, label, metadata and options onto the widget.
    fn bind(&mut self, binding: WidgetBinding) {
        let core = self.core_mut();
        core.id = binding.id;
        core.label = binding.label;
        core.metadata = binding.metadata;
        core.options = binding.options;
    }

    /// Replaces the value without emitting a change.
    fn set_value(&mut self, value: NativeValue) {
        self.core_mut().value = value;
    }

    /// Applies a user edit and emits a change notification.
    fn input(&mut self, value: NativeValue) {
        let core = self.core_mut();
        if core.disposed {
            return;
        }
        core.value = value.clone();
        core.changes.push_back(value);
    }

    /// Drains emitted changes in emission order.
    fn take_changes(&mut self) -> Vec<NativeValue> {
        self.core_mut().changes.drain(..).collect()
    }

    /// Releases the widget; later edits are ignored.
    fn dispose(&mut self) {
        let core = self.core_mut();
        core.disposed = true;
        core.changes.clear();
    }

    /// Returns whether [`FieldWidget::dispose`] was called.
    fn is_disposed(&self) -> bool {
        self.core().disposed
    }

    /// Edit surface.
    fn render_edit(&self) -> RenderedField {
        RenderedField::from_widget(self.core(), RenderMode::Edit, self.input_kind(), self.display_text())
    }

    /// Compact list surface.
    fn render_list(&self) -> RenderedField {
        let mut text = self.display_text();
        if text.chars().count() > 40 {
            text = text.chars().take(39).chain(std::iter::once('…')).collect();
        }
        RenderedField::from_widget(self.core(), RenderMode::List, "cell", text)
    }

    /// Read-only detail surface.
    fn render_view(&self) -> RenderedField {
        RenderedField::from_widget(self.core(), RenderMode::View, "text", self.display_text())
    }

    /// Selects the render surface for `mode`.
    fn render(&self, mode: RenderMode) -> RenderedField {
        match mode {
            RenderMode::Edit => self.render_edit(),
            RenderMode::List => self.render_list(),
            RenderMode::View => self.render_view(),
        }
    }
}
