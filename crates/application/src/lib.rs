//! Form session orchestration, model store and widget ports.

#![forbid(unsafe_code)]

mod field_mount;
mod field_registry;
mod field_validators;
mod field_widget;
mod form_orchestrator;
mod form_ports;
mod initialization_barrier;
mod model_store;
mod panel_state;
mod render_model;

#[cfg(test)]
mod test_support;

pub use field_mount::{FieldMount, MountSpec, MountState, ResyncQueue};
pub use field_registry::{FieldTypeRegistry, WidgetFactory};
pub use field_validators::{FieldValidator, derive_validators, run_validators};
pub use field_widget::{FieldWidget, NativeValue, WidgetBinding, WidgetCore};
pub use form_orchestrator::{FormOrchestrator, count_field_nodes};
pub use form_ports::{FormStructureSource, SubmissionDocument, SubmitOutcome, SubmitSink};
pub use initialization_barrier::{BarrierProgress, CompletionCallback, InitializationBarrier};
pub use model_store::{
    EntryShape, ModelEntry, ModelStore, StoreSnapshot, SubscriptionId, ValueListener,
};
pub use panel_state::{EditState, Expansion, PanelState, RowSave};
pub use render_model::{RenderedField, RenderedForm, RenderedNode, RenderedRow, RowKey};
