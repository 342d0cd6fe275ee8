use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formweave_application::{FieldWidget, NativeValue, WidgetCore};
use formweave_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::unsupported;

/// Reference to an uploaded file as stored in the submission document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    /// Original file name.
    pub name: String,
    /// Location returned by the upload endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl FileReference {
    fn parse(value: &Value) -> AppResult<Self> {
        let reference: Self = serde_json::from_value(value.clone())
            .map_err(|error| AppError::Validation(format!("invalid file reference: {error}")))?;
        if reference.name.trim().is_empty() {
            return Err(AppError::Validation(
                "file reference requires a name".to_owned(),
            ));
        }
        Ok(reference)
    }

    fn to_value(&self) -> AppResult<Value> {
        serde_json::to_value(self)
            .map_err(|error| AppError::Internal(format!("failed to encode file reference: {error}")))
    }
}

/// File widget storing a [`FileReference`] object.
///
/// Upload transport happens outside the engine; a finished upload is fed
/// back through [`FieldWidget::input`] as the reference object.
#[derive(Default)]
pub struct FileWidget {
    core: WidgetCore,
}

impl FieldWidget for FileWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn input_kind(&self) -> &'static str {
        "file"
    }

    fn display_text(&self) -> String {
        let NativeValue::Json(value) = self.value() else {
            return String::new();
        };
        match FileReference::parse(value) {
            Ok(FileReference {
                name,
                size: Some(size),
                ..
            }) => format!("{name} ({} KB)", size.div_ceil(1024)),
            Ok(reference) => reference.name,
            Err(_) => String::new(),
        }
    }

    fn to_transport(&self, value: &NativeValue) -> AppResult<Value> {
        match value {
            NativeValue::Null => Ok(Value::Null),
            NativeValue::Json(value) => FileReference::parse(value)?.to_value(),
            other => Err(unsupported(self, other)),
        }
    }

    fn from_transport(&self, value: &Value) -> AppResult<NativeValue> {
        match value {
            Value::Null => Ok(NativeValue::Null),
            Value::String(name) if name.trim().is_empty() => Ok(NativeValue::Null),
            Value::String(name) => FileReference {
                name: name.clone(),
                url: None,
                size: None,
                content_type: None,
            }
            .to_value()
            .map(NativeValue::Json),
            other => FileReference::parse(other)?
                .to_value()
                .map(NativeValue::Json),
        }
    }
}

/// Publishes whether any upload is running as a `watch` signal.
///
/// Hand the receiver to the form orchestrator so pending uploads block
/// submission.
#[derive(Clone)]
pub struct UploadTracker {
    active: Arc<AtomicUsize>,
    sender: Arc<watch::Sender<bool>>,
}

impl UploadTracker {
    /// Creates a tracker and the receiver side of its signal.
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                active: Arc::new(AtomicUsize::new(0)),
                sender: Arc::new(sender),
            },
            receiver,
        )
    }

    /// Marks one upload as started until the returned guard drops.
    #[must_use]
    pub fn start(&self) -> UploadGuard {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.sender.send_replace(true);
        debug!(active, "upload started");
        UploadGuard {
            tracker: self.clone(),
        }
    }

    /// Returns the number of running uploads.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Keeps one upload registered with its [`UploadTracker`].
pub struct UploadGuard {
    tracker: UploadTracker,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        let remaining = self.tracker.active.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        if remaining == 0 {
            self.tracker.sender.send_replace(false);
        }
        debug!(active = remaining, "upload finished");
    }
}
