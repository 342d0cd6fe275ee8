use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::form_ports::{SubmissionDocument, SubmitOutcome};

use super::FormOrchestrator;

impl FormOrchestrator {
    /// Validates every enabled entry and hands the flat document to the
    /// submit sink.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if !self.mode.is_editable() {
            return SubmitOutcome::NotEditable;
        }
        if !self.barrier.is_completed() {
            info!(session_id = %self.session_id, "submit blocked until initialization completes");
            return SubmitOutcome::Blocked;
        }
        if self.is_submitting() {
            info!(session_id = %self.session_id, "submit blocked by in-flight work");
            return SubmitOutcome::Blocked;
        }

        self.after_change();
        if !self.store.validate_all() {
            self.store.mark_all_touched();
            self.generation += 1;
            let invalid_paths = self.store.invalid_paths();
            info!(
                session_id = %self.session_id,
                invalid = invalid_paths.len(),
                "submit rejected by validation"
            );
            return SubmitOutcome::Invalid { invalid_paths };
        }

        let document = SubmissionDocument::new(self.session_id, self.store.raw_document().clone());
        let sink = Arc::clone(&self.sink);
        let result = {
            let _in_flight = InFlight::enter(&mut self.submitting);
            sink.submit(document.clone()).await
        };

        match result {
            Ok(()) => {
                info!(
                    session_id = %self.session_id,
                    fields = document.values().len(),
                    "form submitted"
                );
                SubmitOutcome::Submitted(document)
            }
            Err(error) => {
                warn!(session_id = %self.session_id, error = %error, "form submission failed");
                SubmitOutcome::Failed {
                    message: error.to_string(),
                }
            }
        }
    }

    /// Marks external work, such as a file upload, as in flight.
    pub fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }

    /// Returns whether a submit or an upload is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
            || self
                .upload_signal
                .as_ref()
                .is_some_and(|signal| *signal.borrow())
    }

    /// Follows an upload-in-progress signal published by file widgets.
    pub fn attach_upload_signal(&mut self, signal: watch::Receiver<bool>) {
        self.upload_signal = Some(signal);
    }
}

/// Holds the submitting flag while the sink call runs.
///
/// Clears the flag on drop, so a submit future dropped mid-await does not
/// block later submits.
struct InFlight<'a> {
    flag: &'a mut bool,
}

impl<'a> InFlight<'a> {
    fn enter(flag: &'a mut bool) -> Self {
        *flag = true;
        Self { flag }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}
