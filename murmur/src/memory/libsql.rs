use std::sync::Arc;

use async_trait::async_trait;

use crate::db::repository::MemoryRepository;
use crate::db::Database;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::memory::MemoryStore;
use crate::models::{collection_name, parse_collection_name, MemoryHit, Metadata};

/// Memory store on the local `bot_memories` table, searched with libsql vector functions.
pub struct LibSqlMemoryStore {
    db: Database,
    embedder: Arc<dyn Embedder>,
}

impl LibSqlMemoryStore {
    pub fn new(db: Database, embedder: Arc<dyn Embedder>) -> Self {
        Self { db, embedder }
    }
}

#[async_trait]
impl MemoryStore for LibSqlMemoryStore {
    async fn add(&self, bot_id: i64, text: &str, metadata: Metadata) -> Result<String> {
        let embedding = self.embedder.embed(text).await?;
        let id = uuid::Uuid::new_v4().to_string();

        let conn = self.db.connect()?;
        MemoryRepository::insert(
            &conn,
            &collection_name(bot_id),
            &id,
            text,
            &metadata,
            &embedding,
        )
        .await?;

        tracing::debug!(bot_id, memory_id = %id, "Stored memory");
        Ok(id)
    }

    async fn search(&self, bot_id: i64, query: &str, limit: u32) -> Result<Vec<MemoryHit>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let conn = self.db.connect()?;
        MemoryRepository::search(&conn, &collection_name(bot_id), &embedding, limit).await
    }

    async fn delete(&self, bot_id: i64) -> Result<bool> {
        let conn = self.db.connect()?;
        MemoryRepository::delete_collection(&conn, &collection_name(bot_id)).await
    }

    async fn list_known_bot_ids(&self) -> Result<Vec<i64>> {
        let conn = self.db.connect()?;
        let names = MemoryRepository::list_collections(&conn).await?;

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            match parse_collection_name(&name) {
                Some(id) => ids.push(id),
                None => {
                    tracing::warn!(collection = %name, "Skipping unparseable memory collection name")
                }
            }
        }
        Ok(ids)
    }

    async fn ensure_collection(&self, bot_id: i64) -> Result<()> {
        let conn = self.db.connect()?;
        MemoryRepository::ensure_collection(&conn, &collection_name(bot_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::error::MurmurError;
    use crate::models::context_metadata;
    use tempfile::TempDir;

    /// Maps a few keywords onto axis-aligned vectors.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let text = text.to_lowercase();
            if text.contains("fail") {
                return Err(MurmurError::Embedding("boom".to_string()));
            }
            Ok(vec![
                if text.contains("cat") { 1.0 } else { 0.0 },
                if text.contains("sea") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    async fn setup_store() -> (LibSqlMemoryStore, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("file:{}", temp_dir.path().join("memories.db").display()),
            auth_token: None,
            local_path: None,
        };
        let db = Database::new(&config, 3).await.unwrap();
        (LibSqlMemoryStore::new(db, Arc::new(KeywordEmbedder)), temp_dir)
    }

    #[tokio::test]
    async fn test_add_then_search_is_scoped_per_bot() {
        let (store, _dir) = setup_store().await;
        store
            .add(1, "I adore my cat", context_metadata("post", 10))
            .await
            .unwrap();
        store
            .add(1, "The sea was calm", context_metadata("post", 11))
            .await
            .unwrap();
        store
            .add(2, "Another cat story", context_metadata("post", 12))
            .await
            .unwrap();

        let hits = store.search(1, "cat pictures", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "I adore my cat");
        assert_eq!(hits[0].metadata["context_id"], "10");
    }

    #[tokio::test]
    async fn test_search_unknown_bot_is_empty() {
        let (store, _dir) = setup_store().await;
        assert!(store.search(99, "cat", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_known_ids() {
        let (store, _dir) = setup_store().await;
        store.ensure_collection(4).await.unwrap();
        store.add(5, "sea breeze", Metadata::new()).await.unwrap();

        let mut ids = store.list_known_bot_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![4, 5]);

        assert!(store.delete(5).await.unwrap());
        assert_eq!(store.list_known_bot_ids().await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_unparseable_collection_is_skipped() {
        let (store, _dir) = setup_store().await;
        let conn = store.db.connect().unwrap();
        MemoryRepository::ensure_collection(&conn, "scratch").await.unwrap();
        MemoryRepository::ensure_collection(&conn, "bot_7").await.unwrap();

        assert_eq!(store.list_known_bot_ids().await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let (store, _dir) = setup_store().await;
        let err = store.add(1, "this will fail", Metadata::new()).await.unwrap_err();
        assert!(matches!(err, MurmurError::Embedding(_)));
    }
}
