use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::Database;
use crate::db::repository::{ActivityRepository, BotRepository};
use crate::db::traits::{ActivityStore, BotStore, DatabaseBackend, MetadataStore};
use crate::db::MetadataRepository;
use crate::error::Result;
use crate::models::{Activity, ActivityType, Bot, NewActivity, NewBot};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl BotStore for LibSqlBackend {
    async fn create_bot(&self, bot: &NewBot, last_active: DateTime<Utc>) -> Result<Bot> {
        let conn = self.db.connection().await?;
        BotRepository::create(&conn, bot, last_active).await
    }
    async fn get_bot(&self, id: i64) -> Result<Option<Bot>> {
        let conn = self.db.connect()?;
        BotRepository::get_by_id(&conn, id).await
    }
    async fn get_bot_by_name(&self, name: &str) -> Result<Option<Bot>> {
        let conn = self.db.connect()?;
        BotRepository::get_by_name(&conn, name).await
    }
    async fn bot_name_exists(&self, name: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        BotRepository::name_exists(&conn, name).await
    }
    async fn list_bots(&self, skip: u32, limit: u32) -> Result<Vec<Bot>> {
        let conn = self.db.connect()?;
        BotRepository::list(&conn, skip, limit).await
    }
    async fn list_all_bots(&self) -> Result<Vec<Bot>> {
        let conn = self.db.connect()?;
        BotRepository::list_all(&conn).await
    }
    async fn list_due_bots(&self, now: DateTime<Utc>) -> Result<Vec<Bot>> {
        let conn = self.db.connect()?;
        BotRepository::list_due(&conn, now).await
    }
    async fn list_bot_ids(&self) -> Result<Vec<i64>> {
        let conn = self.db.connect()?;
        BotRepository::list_ids(&conn).await
    }
    async fn count_bots(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        BotRepository::count(&conn).await
    }
    async fn count_bots_by_category(&self) -> Result<BTreeMap<String, u64>> {
        let conn = self.db.connect()?;
        BotRepository::count_by_category(&conn).await
    }
    async fn update_bot_profile(&self, id: i64, bot: &NewBot) -> Result<bool> {
        let conn = self.db.connect()?;
        BotRepository::update_profile(&conn, id, bot).await
    }
    async fn set_bot_remote_id(&self, id: i64, remote_id: i64) -> Result<()> {
        let conn = self.db.connect()?;
        BotRepository::set_remote_id(&conn, id, remote_id).await
    }
    async fn set_bot_last_active(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.db.connect()?;
        BotRepository::set_last_active(&conn, id, at).await
    }
    async fn delete_bot(&self, id: i64) -> Result<bool> {
        let conn = self.db.connection().await?;
        BotRepository::delete(&conn, id).await
    }
}

#[async_trait]
impl ActivityStore for LibSqlBackend {
    async fn record_activity(&self, activity: &NewActivity) -> Result<Activity> {
        let conn = self.db.connection().await?;
        ActivityRepository::create(&conn, activity).await
    }
    async fn activity_exists(
        &self,
        bot_id: i64,
        activity_type: ActivityType,
        target_id: &str,
    ) -> Result<bool> {
        let conn = self.db.connect()?;
        ActivityRepository::exists(&conn, bot_id, activity_type, target_id).await
    }
    async fn count_activities_on_target(
        &self,
        bot_id: i64,
        activity_type: ActivityType,
        target_id: &str,
    ) -> Result<u64> {
        let conn = self.db.connect()?;
        ActivityRepository::count_on_target(&conn, bot_id, activity_type, target_id).await
    }
    async fn list_bot_activities(
        &self,
        bot_id: i64,
        activity_type: Option<ActivityType>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Activity>> {
        let conn = self.db.connect()?;
        ActivityRepository::list_for_bot(&conn, bot_id, activity_type, skip, limit).await
    }
    async fn list_recent_activities(&self, limit: u32) -> Result<Vec<Activity>> {
        let conn = self.db.connect()?;
        ActivityRepository::list_recent(&conn, limit).await
    }
}

#[async_trait]
impl MetadataStore for LibSqlBackend {
    async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
        let conn = self.db.connect()?;
        MetadataRepository::get_embedding_dimensions(&conn).await
    }
    async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
        let conn = self.db.connect()?;
        MetadataRepository::set_embedding_dimensions(&conn, dims).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
