use async_trait::async_trait;
use formweave_application::FormStructureSource;
use formweave_core::{AppError, AppResult};
use formweave_domain::FormStructure;
use tracing::info;
use url::Url;

/// Fetches a form structure document from the backend over HTTP.
pub struct HttpFormStructureSource {
    http_client: reqwest::Client,
    url: Url,
}

impl HttpFormStructureSource {
    /// Creates a source fetching `url` on every load.
    #[must_use]
    pub fn new(http_client: reqwest::Client, url: Url) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl FormStructureSource for HttpFormStructureSource {
    async fn load(&self) -> AppResult<FormStructure> {
        let response = self
            .http_client
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("form structure request failed: {error}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("no form structure at '{}'", self.url)));
        }
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "form structure request failed with status {status}"
            )));
        }

        let raw = response.text().await.map_err(|error| {
            AppError::Internal(format!("failed to read form structure body: {error}"))
        })?;
        let structure = FormStructure::from_json(&raw)?;
        info!(url = %self.url, "form structure loaded over HTTP");
        Ok(structure)
    }
}
