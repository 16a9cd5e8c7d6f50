mod api;
pub mod prompts;
mod provider;

use async_trait::async_trait;

use crate::error::Result;

pub(crate) use api::default_base_url;
pub use api::{CompletionOptions, LlmApiClient};
pub use provider::{strip_think_tags, LlmBackend, LlmProvider};

/// Free-text generation from a single prompt.
///
/// Implementations fail with `MurmurError::Generation` when the provider
/// returns nothing usable.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;

    /// Whether a backend is configured at all.
    fn is_available(&self) -> bool {
        true
    }
}
