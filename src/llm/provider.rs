use async_trait::async_trait;

use crate::errors::LocatorResult;
use crate::llm::types::{ImageInput, TreeRequest};

/// Vision model capability used by the pipelines. The geometric core never
/// constructs one; tests inject in-memory fakes.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Ask the model to paint a marker on `description`.
    /// `Ok(None)` when the response carried no image.
    async fn mark_location(
        &self,
        image: &ImageInput,
        description: &str,
    ) -> LocatorResult<Option<Vec<u8>>>;

    /// Ask the model for an element tree; returns the raw JSON text.
    async fn describe_tree(&self, image: &ImageInput, request: &TreeRequest)
        -> LocatorResult<String>;
}
