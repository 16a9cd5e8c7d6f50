use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::embeddings::api::RemoteEmbedder;
use crate::embeddings::Embedder;
use crate::error::{MurmurError, Result};
use crate::llm::default_base_url;
use crate::social::RetryPolicy;

const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
        batch_size: usize,
    },
    Api {
        client: RemoteEmbedder,
    },
}

/// Text embedder backed by a local fastembed model or a remote endpoint,
/// chosen from the `provider/` prefix of the configured model.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        if provider == "local" {
            return Self::new_local(config, model_name);
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());
        let client = RemoteEmbedder::new(
            &base_url,
            config.api_key.clone(),
            model_name,
            API_TIMEOUT,
            RetryPolicy::default(),
        )?;

        tracing::info!(provider, model = model_name, "Using remote embedding provider");
        Ok(Self {
            backend: EmbeddingBackend::Api { client },
            dimensions: config.dimensions,
        })
    }

    fn new_local(config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        let embedding_model = resolve_embedding_model(model_name);
        let model = TextEmbedding::try_new(
            InitOptions::new(embedding_model).with_show_download_progress(true),
        )
        .map_err(|e| MurmurError::Embedding(e.to_string()))?;

        tracing::info!(model = model_name, "Loaded local embedding model");
        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
                batch_size: config.batch_size.max(1),
            },
            dimensions: config.dimensions,
        })
    }

    fn check_dimensions(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
        if embedding.len() != self.dimensions {
            return Err(MurmurError::Embedding(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }
}

async fn embed_locally(
    model: &Arc<Mutex<TextEmbedding>>,
    batch_size: usize,
    text: &str,
) -> Result<Vec<f32>> {
    let model = Arc::clone(model);
    let texts = vec![text.to_string()];
    let mut embeddings = tokio::task::spawn_blocking(move || {
        let mut model = model
            .lock()
            .map_err(|e| MurmurError::Embedding(format!("Embedding model lock poisoned: {e}")))?;
        model
            .embed(texts, Some(batch_size))
            .map_err(|e| MurmurError::Embedding(e.to_string()))
    })
    .await
    .map_err(|e| MurmurError::Embedding(format!("Embedding worker failed: {e}")))??;

    embeddings
        .pop()
        .ok_or_else(|| MurmurError::Embedding("No embedding generated".to_string()))
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = match &self.backend {
            EmbeddingBackend::Local { model, batch_size } => {
                embed_locally(model, *batch_size, text).await?
            }
            EmbeddingBackend::Api { client } => client.embed_one(text).await?,
        };
        self.check_dimensions(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        other => {
            tracing::warn!(model = other, "Unknown local embedding model, using bge-small-en-v1.5");
            EmbeddingModel::BGESmallENV15
        }
    }
}
