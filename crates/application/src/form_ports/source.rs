use async_trait::async_trait;
use formweave_core::AppResult;
use formweave_domain::FormStructure;

/// Inbound port delivering the form structure of one editing session.
#[async_trait]
pub trait FormStructureSource: Send + Sync {
    /// Loads and validates the form structure.
    async fn load(&self) -> AppResult<FormStructure>;
}
