use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{MurmurError, Result};
use crate::llm::api::{CompletionOptions, LlmApiClient};
use crate::llm::TextGenerator;

const THINK_BLOCK_PATTERN: &str = r"(?is)<think>.*?</think>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<Arc<LlmApiClient>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ));
                }
            }
        };

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                client: Some(Arc::new(client)),
            },
            Err(e) => {
                tracing::warn!(model = %config.model, error = %e, "LLM client unavailable");
                Self::unavailable(&e.to_string())
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
        }
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "No LLM client configured".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmProvider {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| MurmurError::LlmUnavailable(self.unavailable_reason()))?;

        let raw = client
            .complete(
                prompt,
                CompletionOptions {
                    temperature: Some(temperature),
                    max_tokens: Some(max_tokens),
                },
            )
            .await?;

        let text = strip_think_tags(&raw)?;
        if text.is_empty() {
            return Err(MurmurError::Generation(
                "LLM response was empty after removing reasoning blocks".to_string(),
            ));
        }
        Ok(text)
    }

    fn is_available(&self) -> bool {
        self.client.is_some()
    }
}

/// Remove every `<think>...</think>` block (case-insensitive) and trim.
pub fn strip_think_tags(text: &str) -> Result<String> {
    let pattern = Regex::new(THINK_BLOCK_PATTERN)
        .map_err(|e| MurmurError::Internal(format!("Invalid think-block pattern: {e}")))?;
    Ok(pattern.replace_all(text, "").trim().to_string())
}
