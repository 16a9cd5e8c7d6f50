mod http;
mod retry;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    AccountRequest, Comment, NewComment, NewPost, Post, ProfileRequest, RemoteBotProfile,
};

pub use http::HttpSocialGraphClient;
pub use retry::RetryPolicy;

/// The social network backend as seen by the bots.
///
/// Every call may fail with `MurmurError::Transport`; callers decide whether
/// that is fatal.
#[async_trait]
pub trait SocialGraphClient: Send + Sync {
    async fn get_posts(&self, limit: u32) -> Result<Vec<Post>>;
    async fn get_post(&self, post_id: i64) -> Result<Post>;
    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>>;
    async fn like_post(&self, post_id: i64, user_id: i64) -> Result<()>;
    async fn add_comment(&self, post_id: i64, comment: &NewComment) -> Result<()>;
    /// Returns the remote post id when the server reports one.
    async fn add_post(&self, post: &NewPost) -> Result<Option<i64>>;
    async fn follow_user(&self, target_user_id: i64, follower_id: i64) -> Result<()>;
    /// Registers a user account and returns its remote id.
    async fn create_account(&self, account: &AccountRequest) -> Result<i64>;
    async fn create_profile(&self, profile: &ProfileRequest) -> Result<()>;
    /// Every bot profile known to the network.
    async fn list_bot_profiles(&self) -> Result<Vec<RemoteBotProfile>>;
}
