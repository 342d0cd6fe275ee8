//! Infrastructure adapters for application ports and the bundled widgets.

#![forbid(unsafe_code)]

mod console_submit_sink;
mod default_field_type_registry;
mod file_form_structure_source;
mod http_form_structure_source;
mod http_submit_sink;
mod in_memory_submit_sink;
pub mod widgets;

pub use console_submit_sink::ConsoleSubmitSink;
pub use default_field_type_registry::default_field_type_registry;
pub use file_form_structure_source::FileFormStructureSource;
pub use http_form_structure_source::HttpFormStructureSource;
pub use http_submit_sink::HttpSubmitSink;
pub use in_memory_submit_sink::InMemorySubmitSink;
pub use widgets::UploadTracker;
