use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{MemoryHit, Metadata};

use super::format_timestamp;

/// Vector-backed memory rows grouped into named collections.
pub struct MemoryRepository;

impl MemoryRepository {
    pub async fn ensure_collection(conn: &Connection, collection: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO memory_collections (name, created_at) VALUES (?1, ?2)",
            params![collection, format_timestamp(Utc::now())],
        )
        .await?;
        Ok(())
    }

    pub async fn insert(
        conn: &Connection,
        collection: &str,
        id: &str,
        text: &str,
        metadata: &Metadata,
        embedding: &[f32],
    ) -> Result<()> {
        let embedding_json = serde_json::to_string(embedding)?;
        let metadata_json = serde_json::to_string(metadata)?;

        Self::ensure_collection(conn, collection).await?;
        conn.execute(
            r#"
            INSERT INTO bot_memories (id, collection, text, metadata, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, vector32(?5), ?6)
            "#,
            params![
                id,
                collection,
                text,
                metadata_json,
                embedding_json,
                format_timestamp(Utc::now()),
            ],
        )
        .await?;

        Ok(())
    }

    /// Nearest memories by cosine similarity. Unknown collections yield nothing.
    pub async fn search(
        conn: &Connection,
        collection: &str,
        embedding: &[f32],
        limit: u32,
    ) -> Result<Vec<MemoryHit>> {
        let embedding_json = serde_json::to_string(embedding)?;

        let mut rows = conn
            .query(
                r#"
                SELECT text, metadata,
                       1 - vector_distance_cos(embedding, vector32(?1)) AS score
                FROM bot_memories
                WHERE collection = ?2 AND embedding IS NOT NULL
                ORDER BY score DESC
                LIMIT ?3
                "#,
                params![embedding_json, collection, limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let metadata: Metadata =
                serde_json::from_str(&row.get::<String>(1)?).unwrap_or_default();
            results.push(MemoryHit {
                text: row.get(0)?,
                metadata,
                relevance: row.get::<f64>(2)? as f32,
            });
        }

        Ok(results)
    }

    /// Drop a collection and every memory in it.
    pub async fn delete_collection(conn: &Connection, collection: &str) -> Result<bool> {
        let tx = conn.transaction().await?;

        let outcome = async {
            tx.execute(
                "DELETE FROM bot_memories WHERE collection = ?1",
                params![collection],
            )
            .await?;
            tx.execute(
                "DELETE FROM memory_collections WHERE name = ?1",
                params![collection],
            )
            .await
        }
        .await;

        match outcome {
            Ok(affected) => {
                tx.commit().await?;
                Ok(affected > 0)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(collection, error = %rollback_err, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    pub async fn list_collections(conn: &Connection) -> Result<Vec<String>> {
        let mut rows = conn
            .query("SELECT name FROM memory_collections ORDER BY name", ())
            .await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            names.push(row.get::<String>(0)?);
        }
        Ok(names)
    }

    pub async fn count(conn: &Connection, collection: &str) -> Result<u64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM bot_memories WHERE collection = ?1",
                params![collection],
            )
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }
}
