mod libsql;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{MemoryHit, Metadata};

pub use self::libsql::LibSqlMemoryStore;

/// Per-bot vector memory, one collection per bot id.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store one memory and return its id.
    async fn add(&self, bot_id: i64, text: &str, metadata: Metadata) -> Result<String>;

    /// Nearest memories to `query`. A missing collection yields an empty list.
    async fn search(&self, bot_id: i64, query: &str, limit: u32) -> Result<Vec<MemoryHit>>;

    /// Drop the bot's whole collection. Returns whether it existed.
    async fn delete(&self, bot_id: i64) -> Result<bool>;

    /// Bot ids recovered from collection names; unparseable names are skipped.
    async fn list_known_bot_ids(&self) -> Result<Vec<i64>>;

    /// Create an empty collection for the bot if none exists.
    async fn ensure_collection(&self, bot_id: i64) -> Result<()>;
}
