use async_trait::async_trait;

use crate::{GenerateRequest, ModelAnswer, SearchError};

#[async_trait]
pub trait SearchModel: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Send one conversation to the model, with web-search grounding enabled,
    /// and await the complete answer.  Exactly one outbound call; no retry.
    /// Failures carry their [`SearchError`] kind from the point of failure.
    async fn generate(&self, req: GenerateRequest) -> Result<ModelAnswer, SearchError>;
}
