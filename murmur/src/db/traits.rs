use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Activity, ActivityType, Bot, NewActivity, NewBot};

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------

/// Bot persona records.
#[async_trait]
pub trait BotStore: Send + Sync {
    /// Insert a bot with clamped probabilities. A taken name is a `Conflict`.
    async fn create_bot(&self, bot: &NewBot, last_active: DateTime<Utc>) -> Result<Bot>;
    async fn get_bot(&self, id: i64) -> Result<Option<Bot>>;
    async fn get_bot_by_name(&self, name: &str) -> Result<Option<Bot>>;
    async fn bot_name_exists(&self, name: &str) -> Result<bool>;
    async fn list_bots(&self, skip: u32, limit: u32) -> Result<Vec<Bot>>;
    async fn list_all_bots(&self) -> Result<Vec<Bot>>;
    /// Linked bots with `last_active <= now`.
    async fn list_due_bots(&self, now: DateTime<Utc>) -> Result<Vec<Bot>>;
    async fn list_bot_ids(&self) -> Result<Vec<i64>>;
    async fn count_bots(&self) -> Result<u64>;
    async fn count_bots_by_category(&self) -> Result<BTreeMap<String, u64>>;
    async fn update_bot_profile(&self, id: i64, bot: &NewBot) -> Result<bool>;
    async fn set_bot_remote_id(&self, id: i64, remote_id: i64) -> Result<()>;
    async fn set_bot_last_active(&self, id: i64, at: DateTime<Utc>) -> Result<()>;
    /// Remove a bot together with its activities.
    async fn delete_bot(&self, id: i64) -> Result<bool>;
}

/// Append-only activity ledger, the source of truth for idempotence and rate checks.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// A second like/follow on the same target fails with `Conflict`.
    async fn record_activity(&self, activity: &NewActivity) -> Result<Activity>;
    async fn activity_exists(
        &self,
        bot_id: i64,
        activity_type: ActivityType,
        target_id: &str,
    ) -> Result<bool>;
    async fn count_activities_on_target(
        &self,
        bot_id: i64,
        activity_type: ActivityType,
        target_id: &str,
    ) -> Result<u64>;
    /// Newest first.
    async fn list_bot_activities(
        &self,
        bot_id: i64,
        activity_type: Option<ActivityType>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Activity>>;
    async fn list_recent_activities(&self, limit: u32) -> Result<Vec<Activity>>;
}

/// Key-value metadata store (e.g. embedding dimensions).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>>;
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// A complete database backend that combines all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend: BotStore + ActivityStore + MetadataStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Liveness check.
    async fn ping(&self) -> Result<()>;
}
