use async_trait::async_trait;
use formweave_core::{AppResult, FormSessionId};
use formweave_domain::ModelPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Frozen flat submission document keyed by field id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDocument {
    session_id: FormSessionId,
    values: Map<String, Value>,
}

impl SubmissionDocument {
    /// Creates a submission document.
    #[must_use]
    pub fn new(session_id: FormSessionId, values: Map<String, Value>) -> Self {
        Self { session_id, values }
    }

    /// Returns the editing session the document belongs to.
    #[must_use]
    pub fn session_id(&self) -> FormSessionId {
        self.session_id
    }

    /// Returns field id to transport value pairs.
    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Returns one submitted value.
    #[must_use]
    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }
}

/// Outbound port receiving validated submissions.
#[async_trait]
pub trait SubmitSink: Send + Sync {
    /// Persists one submission document.
    async fn submit(&self, document: SubmissionDocument) -> AppResult<()>;
}

/// Result of one submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The sink accepted the document.
    Submitted(SubmissionDocument),
    /// Validation failed; every entry is now touched.
    Invalid {
        /// Enabled entries that failed validation.
        invalid_paths: Vec<ModelPath>,
    },
    /// A submit or an upload is in flight.
    Blocked,
    /// The active render mode does not allow edits.
    NotEditable,
    /// The sink rejected the document.
    Failed {
        /// Notification text shown to the user.
        message: String,
    },
}

impl SubmitOutcome {
    /// Returns whether the sink accepted the document.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}
