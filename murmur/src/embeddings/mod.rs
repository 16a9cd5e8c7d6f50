mod api;
mod provider;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use crate::error::Result;

pub use provider::EmbeddingProvider;

/// Turns text into a fixed-width vector for memory storage and recall.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;
}
