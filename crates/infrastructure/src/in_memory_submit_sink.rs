use async_trait::async_trait;
use formweave_application::{SubmissionDocument, SubmitSink};
use formweave_core::AppResult;
use tokio::sync::RwLock;

/// Submit sink keeping every accepted document in memory.
#[derive(Debug, Default)]
pub struct InMemorySubmitSink {
    documents: RwLock<Vec<SubmissionDocument>>,
}

impl InMemorySubmitSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns accepted documents in submission order.
    pub async fn submissions(&self) -> Vec<SubmissionDocument> {
        self.documents.read().await.clone()
    }

    /// Returns the most recent document.
    pub async fn last(&self) -> Option<SubmissionDocument> {
        self.documents.read().await.last().cloned()
    }
}

#[async_trait]
impl SubmitSink for InMemorySubmitSink {
    async fn submit(&self, document: SubmissionDocument) -> AppResult<()> {
        self.documents.write().await.push(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use formweave_application::{SubmissionDocument, SubmitSink};
    use formweave_core::FormSessionId;
    use serde_json::{Map, json};

    use super::InMemorySubmitSink;

    #[tokio::test]
    async fn keeps_documents_in_submission_order() {
        let sink = InMemorySubmitSink::new();
        let session_id = FormSessionId::new();
        for name in ["Ada", "Grace"] {
            let mut values = Map::new();
            values.insert("name".to_owned(), json!(name));
            assert!(sink.submit(SubmissionDocument::new(session_id, values)).await.is_ok());
        }

        let submissions = sink.submissions().await;
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].value("name"), Some(&json!("Ada")));
        assert_eq!(
            sink.last().await.and_then(|document| document.value("name").cloned()),
            Some(json!("Grace"))
        );
    }
}
