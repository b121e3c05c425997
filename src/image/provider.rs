//! Try-on provider trait.

use crate::error::Result;
use crate::image::types::{GeneratedImage, TryOnRequest};
use async_trait::async_trait;

/// A remote service that renders a model wearing the submitted garment.
#[async_trait]
pub trait TryOnProvider: Send + Sync {
    /// Generates a try-on photo for the given request.
    ///
    /// Called at most once per request; failures are returned as-is, there
    /// is no retry at this layer.
    async fn generate(&self, request: &TryOnRequest) -> Result<GeneratedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}
