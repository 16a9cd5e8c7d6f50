use serde::Deserialize;
use std::env;

use crate::error::{MurmurError, Result};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

pub const DEFAULT_THEMES: &str = "technology,programming,artificial intelligence,science,news,entertainment,sports,politics,memes,personal,random";
pub const DEFAULT_MAIN_THEME_FOCUS: &str = "Everything and anything, just like Twitter";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: Option<LlmConfig>,
    pub social: SocialConfig,
    pub bots: BotsConfig,
    pub content: ContentConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Sampling temperature used for comments, posts and memories.
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Retry schedule for outbound social graph calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotsConfig {
    pub initial_count: u32,
    pub daily_growth_min: u32,
    pub daily_growth_max: u32,
    pub max_count: u32,
    pub max_comments_per_post: u32,
    /// Minutes.
    pub reaction_delay_min: f64,
    /// Minutes.
    pub reaction_delay_max: f64,
    pub post_fetch_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    pub themes: Vec<String>,
    pub main_theme_focus: String,
    pub diversity_level: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub monitoring_interval_secs: u64,
    pub sync_interval_secs: u64,
    pub growth_interval_secs: u64,
    pub initial_reseed_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            initial_count: 20,
            daily_growth_min: 20,
            daily_growth_max: 50,
            max_count: 5000,
            max_comments_per_post: 3,
            reaction_delay_min: 5.0,
            reaction_delay_max: 30.0,
            post_fetch_limit: 25,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            themes: split_themes(DEFAULT_THEMES),
            main_theme_focus: DEFAULT_MAIN_THEME_FOCUS.to_string(),
            diversity_level: 0.7,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitoring_interval_secs: 60,
            sync_interval_secs: 1800,
            growth_interval_secs: 86400,
            initial_reseed_delay_secs: 86400,
        }
    }
}

fn split_themes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        let bots = BotsConfig::default();
        let content = ContentConfig::default();
        let scheduler = SchedulerConfig::default();
        let retry = RetryConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("MURMUR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MURMUR_PORT", 3000),
                api_keys: env::var("MURMUR_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:murmur.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 256),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
            },
            llm: env_non_empty("LLM_MODEL").map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 3),
                temperature: parse_env_or("TEMPERATURE", DEFAULT_LLM_TEMPERATURE),
                max_tokens: parse_env_or("MAX_TOKENS", 1024),
            }),
            social: SocialConfig {
                base_url: env::var("SOCIAL_NETWORK_URL").unwrap_or_default(),
                api_key: env::var("SOCIAL_NETWORK_API_KEY").unwrap_or_default(),
                timeout_secs: parse_env_or("SOCIAL_NETWORK_TIMEOUT", 30),
                retry: RetryConfig {
                    max_attempts: parse_env_or("SOCIAL_RETRY_MAX_ATTEMPTS", retry.max_attempts),
                    initial_backoff_ms: parse_env_or(
                        "SOCIAL_RETRY_INITIAL_BACKOFF_MS",
                        retry.initial_backoff_ms,
                    ),
                    max_backoff_ms: parse_env_or("SOCIAL_RETRY_MAX_BACKOFF_MS", retry.max_backoff_ms),
                },
            },
            bots: BotsConfig {
                initial_count: parse_env_or("INITIAL_BOTS_COUNT", bots.initial_count),
                daily_growth_min: parse_env_or("DAILY_BOTS_GROWTH_MIN", bots.daily_growth_min),
                daily_growth_max: parse_env_or("DAILY_BOTS_GROWTH_MAX", bots.daily_growth_max),
                max_count: parse_env_or("MAX_BOTS_COUNT", bots.max_count),
                max_comments_per_post: parse_env_or(
                    "MAX_COMMENTS_PER_POST",
                    bots.max_comments_per_post,
                ),
                reaction_delay_min: parse_env_or("REACTION_DELAY_MIN", bots.reaction_delay_min),
                reaction_delay_max: parse_env_or("REACTION_DELAY_MAX", bots.reaction_delay_max),
                post_fetch_limit: parse_env_or("POST_FETCH_LIMIT", bots.post_fetch_limit),
            },
            content: ContentConfig {
                themes: env::var("SOCIAL_NETWORK_THEMES")
                    .map(|raw| split_themes(&raw))
                    .unwrap_or(content.themes),
                main_theme_focus: env::var("MAIN_THEME_FOCUS")
                    .unwrap_or(content.main_theme_focus),
                diversity_level: parse_env_or("THEME_DIVERSITY_LEVEL", content.diversity_level),
            },
            scheduler: SchedulerConfig {
                monitoring_interval_secs: parse_env_or(
                    "MONITORING_INTERVAL",
                    scheduler.monitoring_interval_secs,
                ),
                sync_interval_secs: parse_env_or("SYNC_INTERVAL", scheduler.sync_interval_secs),
                growth_interval_secs: parse_env_or(
                    "GROWTH_INTERVAL",
                    scheduler.growth_interval_secs,
                ),
                initial_reseed_delay_secs: parse_env_or(
                    "INITIAL_RESEED_DELAY",
                    scheduler.initial_reseed_delay_secs,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Check bootstrap settings, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.social.base_url.trim().is_empty() {
            errors.push("SOCIAL_NETWORK_URL is required.".to_string());
        }
        if self.social.api_key.trim().is_empty() {
            errors.push("SOCIAL_NETWORK_API_KEY is required.".to_string());
        }
        if self.social.retry.max_attempts == 0 {
            errors.push("SOCIAL_RETRY_MAX_ATTEMPTS must be at least 1.".to_string());
        }

        match &self.llm {
            None => errors.push("LLM_MODEL is required.".to_string()),
            Some(llm) => {
                if !(0.0..=2.0).contains(&llm.temperature) {
                    errors.push("TEMPERATURE must be between 0 and 2.".to_string());
                }
                if llm.max_tokens == 0 {
                    errors.push("MAX_TOKENS must be positive.".to_string());
                }
            }
        }

        if self.content.themes.is_empty() {
            errors.push("SOCIAL_NETWORK_THEMES is required.".to_string());
        }
        if self.content.main_theme_focus.trim().is_empty() {
            errors.push("MAIN_THEME_FOCUS is required.".to_string());
        }
        if !(0.0..=1.0).contains(&self.content.diversity_level) {
            errors.push("THEME_DIVERSITY_LEVEL must be between 0.0 and 1.0.".to_string());
        }

        let bots = &self.bots;
        if bots.max_count == 0 {
            errors.push("MAX_BOTS_COUNT must be positive.".to_string());
        }
        if bots.initial_count == 0 || bots.initial_count > bots.max_count {
            errors.push("INITIAL_BOTS_COUNT must be > 0 and <= MAX_BOTS_COUNT.".to_string());
        }
        if bots.daily_growth_min > bots.daily_growth_max {
            errors.push("DAILY_BOTS_GROWTH_MIN must be <= DAILY_BOTS_GROWTH_MAX.".to_string());
        }
        if !(bots.reaction_delay_min >= 0.0 && bots.reaction_delay_min <= bots.reaction_delay_max)
        {
            errors.push("REACTION_DELAY_MIN must be <= REACTION_DELAY_MAX.".to_string());
        }
        if self.scheduler.monitoring_interval_secs == 0 {
            errors.push("MONITORING_INTERVAL must be positive.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MurmurError::Configuration(errors.join("\n")))
        }
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}
