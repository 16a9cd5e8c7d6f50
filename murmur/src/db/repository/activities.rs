use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{Activity, ActivityType, NewActivity};

use super::{format_timestamp, map_unique_violation, parse_timestamp};

const ACTIVITY_COLUMNS: &str = "id, bot_id, activity_type, target_id, content, created_at";

pub struct ActivityRepository;

impl ActivityRepository {
    /// Append an activity. A repeated like/follow on the same target is a conflict
    /// and leaves the ledger unchanged.
    pub async fn create(conn: &Connection, activity: &NewActivity) -> Result<Activity> {
        let created_at = Utc::now();

        conn.execute(
            r#"
            INSERT INTO bot_activities (bot_id, activity_type, target_id, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                activity.bot_id,
                activity.activity_type.as_str(),
                activity.target_id.clone(),
                activity.content.clone(),
                format_timestamp(created_at),
            ],
        )
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                format!(
                    "Bot {} already recorded {} on {}",
                    activity.bot_id, activity.activity_type, activity.target_id
                )
            })
        })?;

        Ok(Activity {
            id: conn.last_insert_rowid(),
            bot_id: activity.bot_id,
            activity_type: activity.activity_type,
            target_id: activity.target_id.clone(),
            content: activity.content.clone(),
            created_at,
        })
    }

    pub async fn exists(
        conn: &Connection,
        bot_id: i64,
        activity_type: ActivityType,
        target_id: &str,
    ) -> Result<bool> {
        let mut rows = conn
            .query(
                "SELECT 1 FROM bot_activities \
                 WHERE bot_id = ?1 AND activity_type = ?2 AND target_id = ?3 LIMIT 1",
                params![bot_id, activity_type.as_str(), target_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    pub async fn count_on_target(
        conn: &Connection,
        bot_id: i64,
        activity_type: ActivityType,
        target_id: &str,
    ) -> Result<u64> {
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM bot_activities \
                 WHERE bot_id = ?1 AND activity_type = ?2 AND target_id = ?3",
                params![bot_id, activity_type.as_str(), target_id],
            )
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    /// A bot's activities, newest first, optionally narrowed to one type.
    pub async fn list_for_bot(
        conn: &Connection,
        bot_id: i64,
        activity_type: Option<ActivityType>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Activity>> {
        let mut rows = match activity_type {
            Some(activity_type) => {
                let sql = format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM bot_activities \
                     WHERE bot_id = ?1 AND activity_type = ?2 \
                     ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
                );
                conn.query(
                    &sql,
                    params![bot_id, activity_type.as_str(), limit as i64, skip as i64],
                )
                .await?
            }
            None => {
                let sql = format!(
                    "SELECT {ACTIVITY_COLUMNS} FROM bot_activities \
                     WHERE bot_id = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                );
                conn.query(&sql, params![bot_id, limit as i64, skip as i64])
                    .await?
            }
        };

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_activity(&row)?);
        }
        Ok(results)
    }

    /// Newest activities across all bots.
    pub async fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<Activity>> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM bot_activities \
             ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let mut rows = conn.query(&sql, params![limit as i64]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_activity(&row)?);
        }
        Ok(results)
    }

    fn row_to_activity(row: &libsql::Row) -> Result<Activity> {
        let activity_type: String = row.get(2)?;
        Ok(Activity {
            id: row.get(0)?,
            bot_id: row.get(1)?,
            activity_type: activity_type
                .parse()
                .map_err(crate::error::MurmurError::Internal)?,
            target_id: row.get(3)?,
            content: row.get(4)?,
            created_at: parse_timestamp(&row.get::<String>(5)?),
        })
    }
}
