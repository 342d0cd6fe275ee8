use std::time::Duration;

use async_trait::async_trait;
use formweave_application::{SubmissionDocument, SubmitSink};
use formweave_core::{AppError, AppResult};
use tracing::{debug, warn};
use url::Url;

/// Posts submission documents to a backend endpoint.
///
/// Server errors and `429` are retried with linear backoff; any other
/// non-success status fails immediately.
pub struct HttpSubmitSink {
    http_client: reqwest::Client,
    endpoint: Url,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpSubmitSink {
    /// Creates a new HTTP submit sink.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: Url,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }

    /// Returns the endpoint documents are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SubmitSink for HttpSubmitSink {
    async fn submit(&self, document: SubmissionDocument) -> AppResult<()> {
        let session_id = document.session_id().to_string();
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self
                .http_client
                .post(self.endpoint.clone())
                .header("Idempotency-Key", session_id.as_str())
                .header("X-Formweave-Session", session_id.as_str())
                .json(document.values())
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    debug!(session_id = %session_id, attempt, "submission accepted");
                    return Ok(());
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "transient HTTP status {} for submission '{session_id}'",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(AppError::Validation(format!(
                        "submission rejected with status {status}: {body}"
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("submission transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                warn!(
                    session_id = %session_id,
                    attempt,
                    delay_ms = delay,
                    error = last_error.as_deref().unwrap_or_default(),
                    "retrying submission"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            "submission exhausted retries".to_owned()
        })))
    }
}
