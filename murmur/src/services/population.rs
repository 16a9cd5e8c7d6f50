use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::avatar::random_avatar;
use super::username::generate_unique_username;
use super::{ContentGenerator, DecisionEngine, MemoryBridge, SharedRng, TickReport};
use crate::config::BotsConfig;
use crate::db::DatabaseBackend;
use crate::error::{MurmurError, Result};
use crate::models::{
    birth_date_for_age, days_in_month, split_full_name, AccountRequest, Activity, ActionProbabilities,
    ActivityType, Bot, BotCategory, Gender, NewActivity, NewBot, NewPost, ProfileRequest,
    RemoteBotProfile,
};
use crate::social::SocialGraphClient;

const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 65;

/// Result of one pass over the due bots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: u32,
    pub failed: u32,
    /// Due bots left alone because another run was already handling them.
    pub skipped: u32,
}

/// Result of reconciling the local roster with the social network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Remote bots successfully updated or created locally.
    pub synced: u32,
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub orphan_collections_removed: u32,
}

/// Owns the bot population: creation, growth, roster sync and the due-bot loop.
pub struct PopulationManager {
    db: Arc<dyn DatabaseBackend>,
    social: Arc<dyn SocialGraphClient>,
    memory: MemoryBridge,
    content: ContentGenerator,
    decisions: Arc<DecisionEngine>,
    rng: SharedRng,
    config: BotsConfig,
    in_flight: Mutex<HashSet<i64>>,
}

/// Marks a bot as being processed until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<i64>>,
    bot_id: i64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.bot_id);
    }
}

impl PopulationManager {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        social: Arc<dyn SocialGraphClient>,
        memory: MemoryBridge,
        content: ContentGenerator,
        decisions: Arc<DecisionEngine>,
        rng: SharedRng,
        config: BotsConfig,
    ) -> Self {
        Self {
            db,
            social,
            memory,
            content,
            decisions,
            rng,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Top the population up to the configured initial size.
    /// Returns how many bots were created.
    pub async fn ensure_initial_population(&self) -> Result<u32> {
        let count = self.db.count_bots().await?;
        let target = u64::from(self.config.initial_count);
        if count >= target {
            debug!(count, target, "Initial population already present");
            return Ok(0);
        }

        let deficit = (target - count) as u32;
        info!(deficit, "Initializing bots");
        Ok(self.create_many(deficit).await)
    }

    /// Add a random number of bots within the growth band, never exceeding the maximum.
    pub async fn daily_growth(&self) -> Result<u32> {
        let count = self.db.count_bots().await?;
        let max = u64::from(self.config.max_count);
        if count >= max {
            info!(count, "Maximum bot count reached");
            return Ok(0);
        }

        let (lo, hi) = (self.config.daily_growth_min, self.config.daily_growth_max);
        let drawn = self.rng.with(|rng| rng.gen_range(lo.min(hi)..=hi.max(lo)));
        let growth = u64::from(drawn).min(max - count) as u32;

        info!(growth, "Daily growth");
        Ok(self.create_many(growth).await)
    }

    async fn create_many(&self, n: u32) -> u32 {
        let mut created = 0;
        for _ in 0..n {
            match self.create_random_bot().await {
                Ok(bot) => {
                    debug!(bot_id = bot.id, bot = %bot.name, "Created bot");
                    created += 1;
                }
                Err(e) => error!(error = %e, "Failed to create bot"),
            }
        }
        info!(requested = n, created, "Bot creation finished");
        created
    }

    /// Create one bot with a random persona, locally and on the social network.
    ///
    /// A bot whose remote registration fails stays in the local store without
    /// a remote id and the call still fails.
    pub async fn create_random_bot(&self) -> Result<Bot> {
        let (category, gender, age) = self.rng.with(|rng| {
            let category = BotCategory::ALL[rng.gen_range(0..BotCategory::ALL.len())];
            let gender = Gender::CHOICES[rng.gen_range(0..Gender::CHOICES.len())];
            (category, gender, rng.gen_range(MIN_AGE..=MAX_AGE))
        });

        let name = generate_unique_username(self.db.as_ref(), &self.rng).await?;
        let full_name = self.content.full_name(gender, age).await?;
        let description = self.content.bio(category, age, gender).await?;
        let (avatar, probabilities) = self.rng.with(|rng| {
            (
                random_avatar(rng),
                ActionProbabilities::jittered(category, rng),
            )
        });

        let new_bot = NewBot {
            name,
            full_name,
            avatar: Some(avatar),
            age,
            gender,
            prompt_template: category.prompt().to_string(),
            category,
            description,
            probabilities,
            remote_id: None,
        };
        let mut bot = self.db.create_bot(&new_bot, Utc::now()).await?;

        match self.register_remote(&bot).await {
            Ok(remote_id) => {
                bot.remote_id = Some(remote_id);
                info!(bot_id = bot.id, remote_id, bot = %bot.name, category = %category, "Created bot");
                Ok(bot)
            }
            Err(e) => {
                error!(
                    bot_id = bot.id,
                    bot = %bot.name,
                    error = %e,
                    "Bot stored locally but remote registration failed; it stays unlinked"
                );
                Err(e)
            }
        }
    }

    async fn register_remote(&self, bot: &Bot) -> Result<i64> {
        let (first_name, last_name) = split_full_name(&bot.full_name);
        let account = AccountRequest {
            username: bot.name.clone(),
            password: uuid::Uuid::new_v4().to_string(),
            is_bot: true,
            first_name,
            last_name,
            category: bot.category.as_str().to_string(),
            gender: bot.gender.as_str().to_string(),
            prompt: bot.prompt_template.clone(),
            like_probability: bot.probabilities.like,
            comment_probability: bot.probabilities.comment,
            follow_probability: bot.probabilities.follow,
            unfollow_probability: bot.probabilities.unfollow,
            repost_probability: bot.probabilities.post,
        };
        let remote_id = self.social.create_account(&account).await?;

        let today = Utc::now().date_naive();
        let birth_year = today.year() - bot.age as i32;
        let (month, day) = self.rng.with(|rng| {
            let month = rng.gen_range(1..=12);
            (month, rng.gen_range(1..=days_in_month(birth_year, month)))
        });
        let dob = birth_date_for_age(today, bot.age, month, day);

        let profile = ProfileRequest {
            user_id: remote_id,
            name: bot.full_name.clone(),
            image: bot.avatar.clone(),
            dob: dob.format("%Y-%m-%d").to_string(),
            bio: bot.description.clone(),
        };
        self.social.create_profile(&profile).await?;
        // Only a fully registered bot becomes due.
        self.db.set_bot_remote_id(bot.id, remote_id).await?;
        Ok(remote_id)
    }

    /// One tick for a single bot, refused while that bot is already being processed.
    pub async fn react(&self, bot_id: i64) -> Result<TickReport> {
        let _guard = self.claim(bot_id).ok_or_else(|| {
            MurmurError::Conflict(format!("Bot {bot_id} is already being processed"))
        })?;
        self.decisions.tick(bot_id).await
    }

    /// Tick every due bot once, maybe post, then push its next activity into the future.
    pub async fn run_due_activities(&self) -> Result<RunSummary> {
        let now = Utc::now();
        let due = self.db.list_due_bots(now).await?;
        let mut summary = RunSummary::default();
        if due.is_empty() {
            return Ok(summary);
        }
        debug!(count = due.len(), "Running due bots");

        for bot in due {
            let Some(_guard) = self.claim(bot.id) else {
                debug!(bot_id = bot.id, "Bot already in flight, skipping");
                summary.skipped += 1;
                continue;
            };

            match self.act(&bot).await {
                Ok(report) => {
                    debug!(bot_id = bot.id, outcome = report.outcome.as_str(), "Tick finished");
                    summary.processed += 1;
                }
                Err(e) => {
                    error!(bot_id = bot.id, bot = %bot.name, error = %e, "Failed to run bot activity");
                    summary.failed += 1;
                }
            }

            let next = now + self.reaction_delay();
            if let Err(e) = self.db.set_bot_last_active(bot.id, next).await {
                error!(bot_id = bot.id, error = %e, "Failed to reschedule bot");
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Due bot activities complete"
        );
        Ok(summary)
    }

    async fn act(&self, bot: &Bot) -> Result<TickReport> {
        let report = self.decisions.tick_bot(bot).await?;
        if self.rng.chance(bot.probabilities.post) {
            self.create_bot_post(bot.id).await?;
        }
        Ok(report)
    }

    /// Uniform in the configured band, at least one second.
    fn reaction_delay(&self) -> Duration {
        let (lo, hi) = (self.config.reaction_delay_min, self.config.reaction_delay_max);
        let minutes = if hi > lo {
            self.rng.with(|rng| rng.gen_range(lo..=hi))
        } else {
            lo
        };
        let millis = (minutes * 60_000.0).round() as i64;
        Duration::milliseconds(millis.max(1_000))
    }

    /// Publish a generated post for the bot and record it.
    pub async fn create_bot_post(&self, bot_id: i64) -> Result<Activity> {
        let bot = self
            .db
            .get_bot(bot_id)
            .await?
            .ok_or_else(|| MurmurError::NotFound(format!("Bot {bot_id} not found")))?;
        let remote_id = bot.remote_id.ok_or_else(|| {
            MurmurError::Validation(format!("Bot {bot_id} is not linked to a social network account"))
        })?;

        let content = self.content.post(bot.category, Utc::now()).await?;
        let post_id = self
            .social
            .add_post(&NewPost {
                user_id: remote_id,
                content: content.clone(),
            })
            .await?;

        let target = post_id.map(|id| id.to_string()).unwrap_or_default();
        let activity = self
            .db
            .record_activity(&NewActivity::new(bot.id, ActivityType::Post, target).with_content(content))
            .await?;
        info!(bot_id, bot = %bot.name, post_id, "Created post");
        Ok(activity)
    }

    /// Remove a bot, its activities and its memories.
    pub async fn delete_bot(&self, bot_id: i64) -> Result<bool> {
        let deleted = self.db.delete_bot(bot_id).await?;
        if deleted {
            if let Err(e) = self.memory.forget(bot_id).await {
                warn!(bot_id, error = %e, "Failed to delete memory collection");
            }
            info!(bot_id, "Deleted bot");
        }
        Ok(deleted)
    }

    /// Mirror the social network's bot roster locally, keyed by username, then
    /// drop memory collections that no longer belong to a local bot.
    pub async fn sync_with_external_roster(&self) -> Result<SyncSummary> {
        info!("Starting bot synchronization with the social network");
        let remote = self.social.list_bot_profiles().await?;
        let local: HashMap<String, Bot> = self
            .db
            .list_all_bots()
            .await?
            .into_iter()
            .map(|bot| (bot.name.clone(), bot))
            .collect();

        let now = Utc::now();
        let mut summary = SyncSummary::default();
        let remote_names: HashSet<&str> = remote.iter().map(|p| p.username.as_str()).collect();

        for profile in &remote {
            let new_bot = bot_from_profile(profile, now.year());
            let result = match local.get(&profile.username) {
                Some(existing) => match self.db.update_bot_profile(existing.id, &new_bot).await {
                    Ok(_) => {
                        summary.updated += 1;
                        Ok(existing.id)
                    }
                    Err(e) => Err(e),
                },
                None => match self.db.create_bot(&new_bot, now).await {
                    Ok(bot) => {
                        summary.created += 1;
                        Ok(bot.id)
                    }
                    Err(e) => Err(e),
                },
            };

            match result {
                Ok(bot_id) => {
                    summary.synced += 1;
                    if let Err(e) = self.memory.ensure_collection(bot_id).await {
                        warn!(bot_id, error = %e, "Failed to prepare memory collection");
                    }
                }
                Err(e) => error!(username = %profile.username, error = %e, "Failed to sync bot"),
            }
        }

        for (name, bot) in &local {
            if remote_names.contains(name.as_str()) {
                continue;
            }
            match self.delete_bot(bot.id).await {
                Ok(_) => summary.deleted += 1,
                Err(e) => error!(bot_id = bot.id, error = %e, "Failed to delete bot missing remotely"),
            }
        }

        info!(
            synced = summary.synced,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "Bot synchronization complete"
        );

        match self.remove_orphan_collections().await {
            Ok(removed) => summary.orphan_collections_removed = removed,
            Err(e) => error!(error = %e, "Memory collection cleanup failed"),
        }
        Ok(summary)
    }

    async fn remove_orphan_collections(&self) -> Result<u32> {
        let local_ids: HashSet<i64> = self.db.list_bot_ids().await?.into_iter().collect();
        let mut removed = 0;
        for bot_id in self.memory.known_bot_ids().await? {
            if local_ids.contains(&bot_id) {
                continue;
            }
            match self.memory.forget(bot_id).await {
                Ok(_) => {
                    info!(bot_id, "Deleted orphaned memory collection");
                    removed += 1;
                }
                Err(e) => error!(bot_id, error = %e, "Failed to delete orphaned memory collection"),
            }
        }
        if removed == 0 {
            debug!("No orphaned memory collections found");
        }
        Ok(removed)
    }

    fn claim(&self, bot_id: i64) -> Option<InFlight<'_>> {
        let inserted = lock(&self.in_flight).insert(bot_id);
        inserted.then(|| InFlight {
            set: &self.in_flight,
            bot_id,
        })
    }
}

/// Local persona for a remote roster entry. Missing probabilities fall back
/// to the category's base values.
fn bot_from_profile(profile: &RemoteBotProfile, current_year: i32) -> NewBot {
    let category = profile
        .category
        .as_deref()
        .and_then(|c| c.parse::<BotCategory>().ok())
        .unwrap_or(BotCategory::Neutral);
    let base = category.profile().probabilities;

    NewBot {
        name: profile.username.clone(),
        full_name: profile.name.clone().unwrap_or_default(),
        avatar: profile.image.clone(),
        age: profile.age_in(current_year),
        gender: profile
            .gender
            .as_deref()
            .map(Gender::parse_lenient)
            .unwrap_or_default(),
        prompt_template: profile
            .prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| category.prompt().to_string()),
        category,
        description: profile.bio.clone().unwrap_or_default(),
        probabilities: ActionProbabilities {
            like: profile.like_probability.unwrap_or(base.like),
            comment: profile.comment_probability.unwrap_or(base.comment),
            follow: profile.follow_probability.unwrap_or(base.follow),
            unfollow: profile.unfollow_probability.unwrap_or(base.unfollow),
            post: profile.repost_probability.unwrap_or(base.post),
        }
        .clamped(),
        remote_id: Some(profile.id),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
