//! Console submit sink for development. Logs documents to tracing output.

use async_trait::async_trait;
use formweave_application::{SubmissionDocument, SubmitSink};
use formweave_core::{AppError, AppResult};
use tracing::info;

/// Development submit sink that logs submissions to the console.
#[derive(Clone)]
pub struct ConsoleSubmitSink;

impl ConsoleSubmitSink {
    /// Creates a new console submit sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSubmitSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmitSink for ConsoleSubmitSink {
    async fn submit(&self, document: SubmissionDocument) -> AppResult<()> {
        let body = serde_json::to_string_pretty(document.values()).map_err(|error| {
            AppError::Internal(format!("failed to encode submission document: {error}"))
        })?;

        info!(
            session_id = %document.session_id(),
            fields = document.values().len(),
            "--- SUBMISSION (console) ---\n{}\n--- END SUBMISSION ---",
            body
        );

        Ok(())
    }
}
