use std::sync::Arc;

use super::ContentGenerator;
use crate::error::Result;
use crate::memory::MemoryStore;
use crate::models::{context_metadata, Bot, MemoryHit};

/// Links persona generation to the per-bot vector memory.
#[derive(Clone)]
pub struct MemoryBridge {
    store: Arc<dyn MemoryStore>,
    content: ContentGenerator,
}

impl MemoryBridge {
    pub fn new(store: Arc<dyn MemoryStore>, content: ContentGenerator) -> Self {
        Self { store, content }
    }

    /// Form a private reflection on `source_text` and store it tagged with its context.
    pub async fn remember(
        &self,
        bot: &Bot,
        source_text: &str,
        context_type: &str,
        context_id: &str,
    ) -> Result<String> {
        let reflection = self
            .content
            .memory(bot.category, source_text, context_type)
            .await?;
        let id = self
            .store
            .add(bot.id, &reflection, context_metadata(context_type, context_id))
            .await?;
        tracing::debug!(bot_id = bot.id, memory_id = %id, context_type, context_id, "Remembered");
        Ok(id)
    }

    /// Nearest memories to `query`; empty when the bot has none yet.
    pub async fn recall(&self, bot_id: i64, query: &str, limit: u32) -> Result<Vec<MemoryHit>> {
        self.store.search(bot_id, query, limit).await
    }

    pub async fn ensure_collection(&self, bot_id: i64) -> Result<()> {
        self.store.ensure_collection(bot_id).await
    }

    pub async fn forget(&self, bot_id: i64) -> Result<bool> {
        self.store.delete(bot_id).await
    }

    pub async fn known_bot_ids(&self) -> Result<Vec<i64>> {
        self.store.list_known_bot_ids().await
    }
}
