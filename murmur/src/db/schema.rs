use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection, embedding_dimensions: usize) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Bot personas
        CREATE TABLE IF NOT EXISTS bots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL DEFAULT '',
            avatar TEXT,
            age INTEGER NOT NULL DEFAULT 0,
            gender TEXT NOT NULL DEFAULT '',
            prompt_template TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            like_probability REAL NOT NULL,
            comment_probability REAL NOT NULL,
            follow_probability REAL NOT NULL,
            unfollow_probability REAL NOT NULL,
            post_probability REAL NOT NULL,
            remote_id INTEGER,
            last_active TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bots_last_active ON bots(last_active);
        CREATE INDEX IF NOT EXISTS idx_bots_category ON bots(category);

        -- Activity ledger
        CREATE TABLE IF NOT EXISTS bot_activities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bot_id INTEGER NOT NULL,
            activity_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            content TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (bot_id) REFERENCES bots(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_bot_activities_bot_type
            ON bot_activities(bot_id, activity_type, created_at);
        CREATE INDEX IF NOT EXISTS idx_bot_activities_created_at ON bot_activities(created_at);
        -- At most one like per post and one follow per user for each bot
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bot_activities_once
            ON bot_activities(bot_id, activity_type, target_id)
            WHERE activity_type IN ('like', 'follow');

        -- Memory collections, one per bot, named bot_<id>
        CREATE TABLE IF NOT EXISTS memory_collections (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        -- Metadata key-value store
        CREATE TABLE IF NOT EXISTS murmur_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    let memories_sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS bot_memories (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            text TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{{}}',
            embedding F32_BLOB({embedding_dimensions}),
            created_at TEXT NOT NULL,
            FOREIGN KEY (collection) REFERENCES memory_collections(name) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_bot_memories_collection ON bot_memories(collection);
        "#
    );
    conn.execute_batch(&memories_sql).await?;

    create_vector_indexes(conn).await?;

    Ok(())
}

async fn create_vector_indexes(conn: &Connection) -> Result<()> {
    let memory_index_exists: bool = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name='bot_memories_embedding_idx'",
            (),
        )
        .await?
        .next()
        .await?
        .is_some();

    if !memory_index_exists {
        if let Err(e) = conn
            .execute(
                "CREATE INDEX IF NOT EXISTS bot_memories_embedding_idx ON bot_memories(libsql_vector_idx(embedding))",
                (),
            )
            .await
        {
            tracing::warn!("Vector index creation failed for bot_memories (may already exist): {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn table_names(conn: &Connection) -> Vec<String> {
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                (),
            )
            .await
            .unwrap();
        let mut names = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            names.push(row.get::<String>(0).unwrap());
        }
        names
    }

    #[tokio::test]
    async fn test_init_schema_creates_tables() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn, 4).await.unwrap();

        let names = table_names(&conn).await;
        for expected in [
            "bot_activities",
            "bot_memories",
            "bots",
            "memory_collections",
            "murmur_meta",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();

        init_schema(&conn, 4).await.unwrap();
        init_schema(&conn, 4).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_index_only_covers_like_and_follow() {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        init_schema(&conn, 4).await.unwrap();
        conn.execute(
            "INSERT INTO bots (id, name, category, like_probability, comment_probability, \
             follow_probability, unfollow_probability, post_probability, last_active, created_at) \
             VALUES (1, 'quiet_otter_1', 'fan', 0.5, 0.5, 0.5, 0.5, 0.1, \
             '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
            (),
        )
        .await
        .unwrap();

        let insert ="INSERT INTO bot_activities (bot_id, activity_type, target_id, created_at) \
                      VALUES (1, ?1, '9', '2026-01-01T00:00:00.000000Z')";

        conn.execute(insert, ["comment"]).await.unwrap();
        conn.execute(insert, ["comment"]).await.unwrap();
        conn.execute(insert, ["like"]).await.unwrap();
        assert!(conn.execute(insert, ["like"]).await.is_err());
    }
}
