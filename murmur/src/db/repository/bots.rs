use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{ActionProbabilities, Bot, BotCategory, Gender, NewBot};

use super::{format_timestamp, map_unique_violation, parse_timestamp};

const BOT_COLUMNS: &str = "id, name, full_name, avatar, age, gender, prompt_template, category, \
     description, like_probability, comment_probability, follow_probability, \
     unfollow_probability, post_probability, remote_id, last_active, created_at";

pub struct BotRepository;

impl BotRepository {
    /// Insert a bot. Probabilities are clamped into their bands before storage.
    pub async fn create(
        conn: &Connection,
        bot: &NewBot,
        last_active: DateTime<Utc>,
    ) -> Result<Bot> {
        let created_at = Utc::now();
        let probabilities = bot.probabilities.clamped();

        conn.execute(
            r#"
            INSERT INTO bots (
                name, full_name, avatar, age, gender, prompt_template, category, description,
                like_probability, comment_probability, follow_probability,
                unfollow_probability, post_probability, remote_id, last_active, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
            )
            "#,
            params![
                bot.name.clone(),
                bot.full_name.clone(),
                bot.avatar.clone(),
                bot.age as i64,
                bot.gender.as_str(),
                bot.prompt_template.clone(),
                bot.category.as_str(),
                bot.description.clone(),
                probabilities.like,
                probabilities.comment,
                probabilities.follow,
                probabilities.unfollow,
                probabilities.post,
                bot.remote_id,
                format_timestamp(last_active),
                format_timestamp(created_at),
            ],
        )
        .await
        .map_err(|e| map_unique_violation(e, || format!("Bot name '{}' is taken", bot.name)))?;

        let id = conn.last_insert_rowid();

        Ok(Bot {
            id,
            name: bot.name.clone(),
            full_name: bot.full_name.clone(),
            avatar: bot.avatar.clone(),
            age: bot.age,
            gender: bot.gender,
            prompt_template: bot.prompt_template.clone(),
            category: bot.category,
            description: bot.description.clone(),
            probabilities,
            remote_id: bot.remote_id,
            last_active,
            created_at,
        })
    }

    pub async fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Bot>> {
        let sql = format!("SELECT {BOT_COLUMNS} FROM bots WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bot(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Bot>> {
        let sql = format!("SELECT {BOT_COLUMNS} FROM bots WHERE name = ?1");
        let mut rows = conn.query(&sql, params![name]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bot(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn name_exists(conn: &Connection, name: &str) -> Result<bool> {
        let mut rows = conn
            .query("SELECT 1 FROM bots WHERE name = ?1 LIMIT 1", params![name])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    pub async fn list(conn: &Connection, skip: u32, limit: u32) -> Result<Vec<Bot>> {
        let sql = format!("SELECT {BOT_COLUMNS} FROM bots ORDER BY id ASC LIMIT ?1 OFFSET ?2");
        let mut rows = conn
            .query(&sql, params![limit as i64, skip as i64])
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_bot(&row)?);
        }
        Ok(results)
    }

    pub async fn list_all(conn: &Connection) -> Result<Vec<Bot>> {
        let sql = format!("SELECT {BOT_COLUMNS} FROM bots ORDER BY id ASC");
        let mut rows = conn.query(&sql, ()).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_bot(&row)?);
        }
        Ok(results)
    }

    /// Linked bots whose next eligible time has passed, oldest first.
    pub async fn list_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Bot>> {
        let sql = format!(
            "SELECT {BOT_COLUMNS} FROM bots \
             WHERE remote_id IS NOT NULL AND last_active <= ?1 \
             ORDER BY last_active ASC"
        );
        let mut rows = conn.query(&sql, params![format_timestamp(now)]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_bot(&row)?);
        }
        Ok(results)
    }

    pub async fn list_ids(conn: &Connection) -> Result<Vec<i64>> {
        let mut rows = conn.query("SELECT id FROM bots ORDER BY id ASC", ()).await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let mut rows = conn.query("SELECT COUNT(*) FROM bots", ()).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    pub async fn count_by_category(conn: &Connection) -> Result<BTreeMap<String, u64>> {
        let mut rows = conn
            .query(
                "SELECT category, COUNT(*) FROM bots GROUP BY category ORDER BY category",
                (),
            )
            .await?;

        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let category: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.insert(category, count.max(0) as u64);
        }
        Ok(counts)
    }

    /// Overwrite persona fields and remote linkage. Leaves `last_active` untouched.
    pub async fn update_profile(conn: &Connection, id: i64, bot: &NewBot) -> Result<bool> {
        let probabilities = bot.probabilities.clamped();
        let affected = conn
            .execute(
                r#"
                UPDATE bots SET
                    name = ?2, full_name = ?3, avatar = ?4, age = ?5, gender = ?6,
                    prompt_template = ?7, category = ?8, description = ?9,
                    like_probability = ?10, comment_probability = ?11,
                    follow_probability = ?12, unfollow_probability = ?13,
                    post_probability = ?14, remote_id = ?15
                WHERE id = ?1
                "#,
                params![
                    id,
                    bot.name.clone(),
                    bot.full_name.clone(),
                    bot.avatar.clone(),
                    bot.age as i64,
                    bot.gender.as_str(),
                    bot.prompt_template.clone(),
                    bot.category.as_str(),
                    bot.description.clone(),
                    probabilities.like,
                    probabilities.comment,
                    probabilities.follow,
                    probabilities.unfollow,
                    probabilities.post,
                    bot.remote_id,
                ],
            )
            .await
            .map_err(|e| map_unique_violation(e, || format!("Bot name '{}' is taken", bot.name)))?;

        Ok(affected > 0)
    }

    pub async fn set_remote_id(conn: &Connection, id: i64, remote_id: i64) -> Result<()> {
        conn.execute(
            "UPDATE bots SET remote_id = ?2 WHERE id = ?1",
            params![id, remote_id],
        )
        .await?;
        Ok(())
    }

    pub async fn set_last_active(conn: &Connection, id: i64, at: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "UPDATE bots SET last_active = ?2 WHERE id = ?1",
            params![id, format_timestamp(at)],
        )
        .await?;
        Ok(())
    }

    /// Delete a bot and its activities atomically.
    pub async fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let tx = conn.transaction().await?;

        let outcome = async {
            tx.execute("DELETE FROM bot_activities WHERE bot_id = ?1", params![id])
                .await?;
            tx.execute("DELETE FROM bots WHERE id = ?1", params![id])
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
                    tracing::warn!(bot_id = id, error = %rollback_err, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    fn row_to_bot(row: &libsql::Row) -> Result<Bot> {
        let gender: String = row.get(5)?;
        let category: String = row.get(7)?;
        let age: i64 = row.get(4)?;

        Ok(Bot {
            id: row.get(0)?,
            name: row.get(1)?,
            full_name: row.get(2)?,
            avatar: row.get(3)?,
            age: age.max(0) as u32,
            gender: Gender::parse_lenient(&gender),
            prompt_template: row.get(6)?,
            category: category.parse().unwrap_or(BotCategory::Neutral),
            description: row.get(8)?,
            probabilities: ActionProbabilities {
                like: row.get(9)?,
                comment: row.get(10)?,
                follow: row.get(11)?,
                unfollow: row.get(12)?,
                post: row.get(13)?,
            },
            remote_id: row.get(14)?,
            last_active: parse_timestamp(&row.get::<String>(15)?),
            created_at: parse_timestamp(&row.get::<String>(16)?),
        })
    }
}
