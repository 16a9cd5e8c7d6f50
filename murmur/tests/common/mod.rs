// Shared fakes and wiring for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use murmur::config::{BotsConfig, Config, DatabaseConfig};
use murmur::db::{Database, DatabaseBackend, LibSqlBackend};
use murmur::error::{MurmurError, Result};
use murmur::llm::TextGenerator;
use murmur::memory::MemoryStore;
use murmur::models::{
    AccountRequest, ActionProbabilities, Bot, BotCategory, Comment, Gender, MemoryHit, Metadata,
    NewBot, NewComment, NewPost, Post, PostAuthor, ProfileRequest, RemoteBotProfile,
};
use murmur::services::{Services, SharedRng};
use murmur::social::SocialGraphClient;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap()
}

// ── Social network ────────────────────────────────────────────────────────

/// In-memory social network that records every write.
#[derive(Default)]
pub struct FakeSocial {
    pub posts: Mutex<Vec<Post>>,
    pub comments: Mutex<Vec<Comment>>,
    pub roster: Mutex<Vec<RemoteBotProfile>>,

    pub likes: Mutex<Vec<(i64, i64)>>,
    pub added_comments: Mutex<Vec<(i64, NewComment)>>,
    pub follows: Mutex<Vec<(i64, i64)>>,
    pub added_posts: Mutex<Vec<NewPost>>,
    pub accounts: Mutex<Vec<AccountRequest>>,
    pub profiles: Mutex<Vec<ProfileRequest>>,

    pub fail_get_posts: AtomicBool,
    pub fail_like: AtomicBool,
    pub fail_accounts: AtomicBool,
    pub fail_profiles: AtomicBool,
    pub next_id: AtomicI64,
}

impl FakeSocial {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        let social = Self::new();
        *lock(&social.posts) = posts;
        social
    }

    fn down(flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(MurmurError::Transport(format!("{what}: connection refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl SocialGraphClient for FakeSocial {
    async fn get_posts(&self, limit: u32) -> Result<Vec<Post>> {
        Self::down(&self.fail_get_posts, "get_posts")?;
        Ok(lock(&self.posts).iter().take(limit as usize).cloned().collect())
    }

    async fn get_post(&self, post_id: i64) -> Result<Post> {
        lock(&self.posts)
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or_else(|| MurmurError::NotFound(format!("Post {post_id} not found")))
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        Ok(lock(&self.comments)
            .iter()
            .filter(|c| c.post == Some(post_id))
            .cloned()
            .collect())
    }

    async fn like_post(&self, post_id: i64, user_id: i64) -> Result<()> {
        Self::down(&self.fail_like, "like_post")?;
        lock(&self.likes).push((post_id, user_id));
        Ok(())
    }

    async fn add_comment(&self, post_id: i64, comment: &NewComment) -> Result<()> {
        lock(&self.added_comments).push((post_id, comment.clone()));
        Ok(())
    }

    async fn add_post(&self, post: &NewPost) -> Result<Option<i64>> {
        lock(&self.added_posts).push(post.clone());
        Ok(Some(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn follow_user(&self, target_user_id: i64, follower_id: i64) -> Result<()> {
        lock(&self.follows).push((target_user_id, follower_id));
        Ok(())
    }

    async fn create_account(&self, account: &AccountRequest) -> Result<i64> {
        Self::down(&self.fail_accounts, "create_account")?;
        lock(&self.accounts).push(account.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn create_profile(&self, profile: &ProfileRequest) -> Result<()> {
        Self::down(&self.fail_profiles, "create_profile")?;
        lock(&self.profiles).push(profile.clone());
        Ok(())
    }

    async fn list_bot_profiles(&self) -> Result<Vec<RemoteBotProfile>> {
        Ok(lock(&self.roster).clone())
    }
}

// ── Text generation ───────────────────────────────────────────────────────

/// Answers every prompt with the same text and counts the calls.
pub struct FakeLlm {
    pub reply: Mutex<String>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(reply.to_string()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeLlm {
    async fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MurmurError::Generation("model overloaded".to_string()));
        }
        Ok(lock(&self.reply).clone())
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Memory ────────────────────────────────────────────────────────────────

/// Collections keyed by bot id. Search returns the newest memories first.
#[derive(Default)]
pub struct FakeMemory {
    pub collections: Mutex<HashMap<i64, Vec<(String, Metadata)>>>,
}

impl FakeMemory {
    pub fn texts(&self, bot_id: i64) -> Vec<String> {
        lock(&self.collections)
            .get(&bot_id)
            .map(|entries| entries.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MemoryStore for FakeMemory {
    async fn add(&self, bot_id: i64, text: &str, metadata: Metadata) -> Result<String> {
        let mut collections = lock(&self.collections);
        let entries = collections.entry(bot_id).or_default();
        entries.push((text.to_string(), metadata));
        Ok(format!("mem-{bot_id}-{}", entries.len()))
    }

    async fn search(&self, bot_id: i64, _query: &str, limit: u32) -> Result<Vec<MemoryHit>> {
        Ok(lock(&self.collections)
            .get(&bot_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit as usize)
                    .map(|(text, metadata)| MemoryHit {
                        text: text.clone(),
                        metadata: metadata.clone(),
                        relevance: 1.0,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, bot_id: i64) -> Result<bool> {
        Ok(lock(&self.collections).remove(&bot_id).is_some())
    }

    async fn list_known_bot_ids(&self) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = lock(&self.collections).keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn ensure_collection(&self, bot_id: i64) -> Result<()> {
        lock(&self.collections).entry(bot_id).or_default();
        Ok(())
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────

pub struct Harness {
    pub db: Arc<dyn DatabaseBackend>,
    pub social: Arc<FakeSocial>,
    pub llm: Arc<FakeLlm>,
    pub memory: Arc<FakeMemory>,
    pub services: Services,
    _dir: TempDir,
}

impl Harness {
    pub async fn new(social: FakeSocial, bots: BotsConfig) -> Self {
        Self::with_seed(social, bots, 42).await
    }

    pub async fn with_seed(social: FakeSocial, bots: BotsConfig, seed: u64) -> Self {
        init_test_logger();
        let dir = tempfile::tempdir().unwrap();
        let database = DatabaseConfig {
            url: format!("file:{}", dir.path().join("murmur.db").display()),
            auth_token: None,
            local_path: None,
        };
        let raw_db = Database::new(&database, 3).await.unwrap();
        let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

        let config = Config {
            database,
            bots,
            llm: None,
            ..Config::default()
        };

        let social = Arc::new(social);
        let llm = Arc::new(FakeLlm::replying("Ada Lovelace"));
        let memory = Arc::new(FakeMemory::default());
        let services = Services::new(
            &config,
            db.clone(),
            social.clone(),
            llm.clone(),
            memory.clone(),
            SharedRng::seeded(seed),
        );

        Self {
            db,
            social,
            llm,
            memory,
            services,
            _dir: dir,
        }
    }

    /// Store a linked bot as-is.
    pub async fn seed_bot(&self, name: &str, remote_id: i64, probabilities: ActionProbabilities) -> Bot {
        self.db
            .create_bot(&new_bot(name, Some(remote_id), probabilities), Utc::now())
            .await
            .unwrap()
    }
}

pub fn bots_config() -> BotsConfig {
    BotsConfig {
        initial_count: 3,
        daily_growth_min: 2,
        daily_growth_max: 4,
        max_count: 10,
        ..BotsConfig::default()
    }
}

pub fn new_bot(name: &str, remote_id: Option<i64>, probabilities: ActionProbabilities) -> NewBot {
    NewBot {
        name: name.to_string(),
        full_name: "Sam Rivers".to_string(),
        avatar: None,
        age: 28,
        gender: Gender::Male,
        prompt_template: BotCategory::Neutral.prompt().to_string(),
        category: BotCategory::Neutral,
        description: "Curious about everything".to_string(),
        probabilities,
        remote_id,
    }
}

pub fn probabilities(like: f64, comment: f64, follow: f64, post: f64) -> ActionProbabilities {
    ActionProbabilities {
        like,
        comment,
        follow,
        unfollow: 0.1,
        post,
    }
}

/// A post dated a few hours ago.
pub fn recent_post(id: i64, author_id: i64, author: &str) -> Post {
    Post {
        id,
        content: format!("Post number {id} about the sea"),
        date: Some((Utc::now() - Duration::hours(3)).format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()),
        reactions_count: 2,
        comments_count: 0,
        user: PostAuthor {
            id: Some(author_id),
            username: Some(author.to_string()),
            name: author.to_string(),
            image: None,
        },
    }
}

pub fn old_post(id: i64) -> Post {
    Post {
        date: Some("2001-05-01T10:00:00Z".to_string()),
        ..recent_post(id, 1, "ancient")
    }
}

pub fn remote_profile(id: i64, username: &str, category: &str) -> RemoteBotProfile {
    RemoteBotProfile {
        id,
        username: username.to_string(),
        name: Some("Remote Person".to_string()),
        dob: Some("1990-01-15".to_string()),
        gender: Some("female".to_string()),
        category: Some(category.to_string()),
        ..Default::default()
    }
}
