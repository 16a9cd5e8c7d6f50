use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::SocialConfig;
use crate::error::{MurmurError, Result};
use crate::models::{
    AccountRequest, Comment, CreatedResource, NewComment, NewPost, Post, ProfileRequest,
    RemoteBotProfile,
};
use crate::social::{RetryPolicy, SocialGraphClient};

const API_KEY_HEADER: &str = "X-API-KEY";

/// REST client for the social network backend.
///
/// Connection failures, 429 and 5xx responses are retried according to the
/// [`RetryPolicy`]. A 404 is `NotFound`; any other non-2xx status fails immediately.
#[derive(Debug, Clone)]
pub struct HttpSocialGraphClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpSocialGraphClient {
    pub fn new(config: &SocialConfig) -> Result<Self> {
        Self::with_retry_policy(config, RetryPolicy::from(&config.retry))
    }

    pub fn with_retry_policy(config: &SocialConfig, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&config.api_key).map_err(|e| {
                MurmurError::Configuration(format!("invalid social network API key: {e}"))
            })?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MurmurError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Sends the request built by `build`, retrying transient failures.
    async fn send(&self, operation: &str, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let failure = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if status == StatusCode::NOT_FOUND {
                        return Err(MurmurError::NotFound(format!("{operation}: {body}")));
                    }
                    let error =
                        MurmurError::Transport(format!("{operation} failed with {status}: {body}"));
                    if !is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) => {
                    let error = MurmurError::Transport(format!("{operation} request failed: {e}"));
                    if !(e.is_connect() || e.is_timeout() || e.is_request()) {
                        return Err(error);
                    }
                    error
                }
            };

            if attempt >= self.retry.max_attempts {
                warn!(operation, attempts = attempt, error = %failure, "Social API call failed");
                return Err(failure);
            }

            let delay = self.retry.delay_for(attempt);
            debug!(operation, attempt, ?delay, error = %failure, "Retrying social API call");
            tokio::time::sleep(delay).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        let response = self.send(operation, || self.client.get(&url)).await?;
        decode(operation, response).await
    }

    async fn post_json(&self, operation: &str, endpoint: &str, body: &Value) -> Result<Value> {
        let url = self.url(endpoint);
        let response = self
            .send(operation, || self.client.post(&url).json(body))
            .await?;

        let text = response
            .text()
            .await
            .map_err(|e| MurmurError::Transport(format!("{operation} response unreadable: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| MurmurError::Transport(format!("{operation} returned invalid JSON: {e}")))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let text = response
        .text()
        .await
        .map_err(|e| MurmurError::Transport(format!("{operation} response unreadable: {e}")))?;
    serde_json::from_str(&text)
        .map_err(|e| MurmurError::Transport(format!("{operation} returned invalid JSON: {e}")))
}

/// Accepts a bare list, a paginated `{"results": [...]}` page, or a single object.
fn into_list<T: DeserializeOwned>(operation: &str, value: Value) -> Result<Vec<T>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) if map.get("results").is_some_and(Value::is_array) => {
            match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        Value::Null => Vec::new(),
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| {
                MurmurError::Transport(format!("{operation} returned an unexpected item: {e}"))
            })
        })
        .collect()
}

#[async_trait]
impl SocialGraphClient for HttpSocialGraphClient {
    async fn get_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let value: Value = self
            .get_json("get_posts", &format!("api/posts?limit={limit}"))
            .await?;
        into_list("get_posts", value)
    }

    async fn get_post(&self, post_id: i64) -> Result<Post> {
        self.get_json("get_post", &format!("api/posts/{post_id}"))
            .await
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let value: Value = self
            .get_json("get_comments", &format!("api/posts/{post_id}/comments/"))
            .await?;
        into_list("get_comments", value)
    }

    async fn like_post(&self, post_id: i64, user_id: i64) -> Result<()> {
        self.post_json(
            "like_post",
            &format!("api/posts/{post_id}/like/"),
            &json!({ "user_id": user_id }),
        )
        .await?;
        Ok(())
    }

    async fn add_comment(&self, post_id: i64, comment: &NewComment) -> Result<()> {
        self.post_json(
            "add_comment",
            &format!("api/posts/{post_id}/comments/"),
            &serde_json::to_value(comment)?,
        )
        .await?;
        Ok(())
    }

    async fn add_post(&self, post: &NewPost) -> Result<Option<i64>> {
        let value = self
            .post_json("add_post", "api/posts/", &serde_json::to_value(post)?)
            .await?;
        Ok(value.get("id").and_then(Value::as_i64))
    }

    async fn follow_user(&self, target_user_id: i64, follower_id: i64) -> Result<()> {
        self.post_json(
            "follow_user",
            &format!("api/users/{target_user_id}/follow/"),
            &json!({ "follower_id": follower_id }),
        )
        .await?;
        Ok(())
    }

    async fn create_account(&self, account: &AccountRequest) -> Result<i64> {
        let value = self
            .post_json("create_account", "api/users/", &serde_json::to_value(account)?)
            .await?;
        let created: CreatedResource = serde_json::from_value(value).map_err(|e| {
            MurmurError::Transport(format!("create_account response had no user id: {e}"))
        })?;
        Ok(created.id)
    }

    async fn create_profile(&self, profile: &ProfileRequest) -> Result<()> {
        self.post_json("create_profile", "api/profiles/", &serde_json::to_value(profile)?)
            .await?;
        Ok(())
    }

    async fn list_bot_profiles(&self) -> Result<Vec<RemoteBotProfile>> {
        let value: Value = self
            .get_json("list_bot_profiles", "api/profiles/?is_bot=true")
            .await?;
        into_list("list_bot_profiles", value)
    }
}
