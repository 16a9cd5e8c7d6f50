use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MurmurError, Result};
use crate::social::RetryPolicy;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
}

/// Embeds one memory text at a time through an OpenAI-compatible
/// `/embeddings` endpoint. Connection failures, 429 and 5xx responses are
/// retried on the [`RetryPolicy`] schedule; anything else fails at once.
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

impl RemoteEmbedder {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MurmurError::Embedding(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            retry,
        })
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbedRequest {
            model: &self.model,
            input: [text],
        };
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut request = self.client.post(&self.url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let failure = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: EmbedResponse = response.json().await.map_err(|e| {
                        MurmurError::Embedding(format!("embedding response unreadable: {e}"))
                    })?;
                    return parsed
                        .data
                        .into_iter()
                        .next()
                        .map(|item| item.embedding)
                        .ok_or_else(|| MurmurError::Embedding("embedding response was empty".to_string()));
                }
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    let error = MurmurError::Embedding(format!("embedding failed with {status}: {detail}"));
                    if !(status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()) {
                        return Err(error);
                    }
                    error
                }
                Err(e) => MurmurError::Embedding(format!("embedding request failed: {e}")),
            };

            if attempt >= self.retry.max_attempts {
                warn!(model = %self.model, attempts = attempt, error = %failure, "Embedding call failed");
                return Err(failure);
            }
            let delay = self.retry.delay_for(attempt);
            debug!(attempt, ?delay, error = %failure, "Retrying embedding call");
            tokio::time::sleep(delay).await;
        }
    }
}
