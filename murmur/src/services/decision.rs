//! Per-bot reaction tick.
//!
//! A tick picks one recent post and walks a fixed sequence of gates
//! (like, comment, follow). Each gate is an independent probability draw.
//! A failing external call inside a gate only disables that gate; failures
//! before the gates run abort the tick.

use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{ContentGenerator, MemoryBridge, SharedRng};
use crate::config::BotsConfig;
use crate::db::DatabaseBackend;
use crate::error::{MurmurError, Result};
use crate::models::{ActivityType, Bot, NewActivity, NewComment, Post};
use crate::social::SocialGraphClient;

const RECALL_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    NoRecentPosts,
    NoAction,
    Success,
    Followed,
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRecentPosts => "no_recent_posts",
            Self::NoAction => "no_action",
            Self::Success => "success",
            Self::Followed => "followed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub bot_id: i64,
    pub outcome: TickOutcome,
    /// The post the bot looked at, absent when there was nothing to react to.
    pub post_id: Option<i64>,
    /// Remote user followed during the tick.
    pub followed_user_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Like,
    Comment,
    /// Only considered once the comment gate has fired its draw.
    Follow,
}

/// Evaluation order within a tick.
pub const GATE_ORDER: [Gate; 3] = [Gate::Like, Gate::Comment, Gate::Follow];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateResult {
    pub taken: bool,
    /// Stop the tick here; no later gate runs.
    pub short_circuit: bool,
}

impl GateResult {
    fn skipped() -> Self {
        Self::default()
    }

    fn taken() -> Self {
        Self {
            taken: true,
            short_circuit: false,
        }
    }

    fn finished() -> Self {
        Self {
            taken: true,
            short_circuit: true,
        }
    }
}

/// What a tick knows about its target post before any gate runs.
struct TickContext<'a> {
    bot: &'a Bot,
    remote_id: i64,
    post: &'a Post,
    target_id: String,
    post_info: String,
    has_liked: bool,
    comments_on_post: u64,
    has_followed: bool,
    comment_gate_entered: bool,
}

pub struct DecisionEngine {
    db: Arc<dyn DatabaseBackend>,
    social: Arc<dyn SocialGraphClient>,
    memory: MemoryBridge,
    content: ContentGenerator,
    rng: SharedRng,
    max_comments_per_post: u32,
    post_fetch_limit: u32,
}

impl DecisionEngine {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        social: Arc<dyn SocialGraphClient>,
        memory: MemoryBridge,
        content: ContentGenerator,
        rng: SharedRng,
        bots: &BotsConfig,
    ) -> Self {
        Self {
            db,
            social,
            memory,
            content,
            rng,
            max_comments_per_post: bots.max_comments_per_post,
            post_fetch_limit: bots.post_fetch_limit,
        }
    }

    /// Load the bot and run one tick for it.
    pub async fn tick(&self, bot_id: i64) -> Result<TickReport> {
        let bot = self
            .db
            .get_bot(bot_id)
            .await?
            .ok_or_else(|| MurmurError::NotFound(format!("Bot {bot_id} not found")))?;
        self.tick_bot(&bot).await
    }

    /// One tick using the given persona and probabilities as-is.
    pub async fn tick_bot(&self, bot: &Bot) -> Result<TickReport> {
        let remote_id = bot.remote_id.ok_or_else(|| {
            MurmurError::Validation(format!(
                "Bot {} is not linked to a social network account",
                bot.id
            ))
        })?;

        let now = Utc::now();
        let posts = self.social.get_posts(self.post_fetch_limit).await?;
        let recent: Vec<Post> = posts.into_iter().filter(|p| p.is_recent(now)).collect();

        let post = match self.rng.with(|rng| recent.choose(rng).cloned()) {
            Some(post) => post,
            None => {
                info!(bot_id = bot.id, bot = %bot.name, "No recent posts to react to");
                return Ok(TickReport {
                    bot_id: bot.id,
                    outcome: TickOutcome::NoRecentPosts,
                    post_id: None,
                    followed_user_id: None,
                });
            }
        };

        let mut ctx = self.gather_context(bot, remote_id, &post).await?;

        let mut action_taken = false;
        for gate in GATE_ORDER {
            let result = match gate {
                Gate::Like => self.like_gate(&ctx).await,
                Gate::Comment => self.comment_gate(&mut ctx).await,
                Gate::Follow => self.follow_gate(&ctx).await,
            };
            debug!(bot_id = bot.id, post_id = post.id, ?gate, ?result, "Gate evaluated");

            if result.short_circuit {
                return Ok(TickReport {
                    bot_id: bot.id,
                    outcome: TickOutcome::Followed,
                    post_id: Some(post.id),
                    followed_user_id: post.user.id,
                });
            }
            action_taken |= result.taken;
        }

        let outcome = if action_taken {
            TickOutcome::Success
        } else {
            info!(bot_id = bot.id, post_id = post.id, "Bot decided not to interact");
            TickOutcome::NoAction
        };

        Ok(TickReport {
            bot_id: bot.id,
            outcome,
            post_id: Some(post.id),
            followed_user_id: None,
        })
    }

    async fn gather_context<'a>(
        &self,
        bot: &'a Bot,
        remote_id: i64,
        post: &'a Post,
    ) -> Result<TickContext<'a>> {
        let comments = if post.comments_count > 0 {
            self.social.get_comments(post.id).await?
        } else {
            Vec::new()
        };
        let post_info = super::render_post_info(post, &comments);
        let target_id = post.id.to_string();

        let has_liked = self
            .db
            .activity_exists(bot.id, ActivityType::Like, &target_id)
            .await?;
        let comments_on_post = self
            .db
            .count_activities_on_target(bot.id, ActivityType::Comment, &target_id)
            .await?;
        let has_followed = match post.user.id {
            Some(author_id) => {
                self.db
                    .activity_exists(bot.id, ActivityType::Follow, &author_id.to_string())
                    .await?
            }
            None => false,
        };

        Ok(TickContext {
            bot,
            remote_id,
            post,
            target_id,
            post_info,
            has_liked,
            comments_on_post,
            has_followed,
            comment_gate_entered: false,
        })
    }

    async fn like_gate(&self, ctx: &TickContext<'_>) -> GateResult {
        if ctx.has_liked || !self.rng.chance(ctx.bot.probabilities.like) {
            return GateResult::skipped();
        }

        if let Err(e) = self
            .social
            .like_post(ctx.post.id, ctx.remote_id)
            .await
        {
            error!(bot_id = ctx.bot.id, post_id = ctx.post.id, error = %e, "Failed to like post");
            return GateResult::skipped();
        }
        if let Err(e) = self
            .db
            .record_activity(&NewActivity::new(ctx.bot.id, ActivityType::Like, &ctx.target_id))
            .await
        {
            error!(bot_id = ctx.bot.id, post_id = ctx.post.id, error = %e, "Failed to record like");
            return GateResult::skipped();
        }
        info!(bot_id = ctx.bot.id, bot = %ctx.bot.name, post_id = ctx.post.id, "Liked post");

        // The like already landed; a lost reflection does not undo it.
        if let Err(e) = self
            .memory
            .remember(ctx.bot, &ctx.post.content, "post", &ctx.target_id)
            .await
        {
            error!(bot_id = ctx.bot.id, post_id = ctx.post.id, error = %e, "Failed to store memory of liked post");
        }
        GateResult::taken()
    }

    /// Effective probability halves with every comment already left on the post.
    pub fn effective_comment_probability(base: f64, comments_on_post: u64) -> f64 {
        let exponent = i32::try_from(comments_on_post).unwrap_or(i32::MAX);
        base * 0.5f64.powi(exponent)
    }

    async fn comment_gate(&self, ctx: &mut TickContext<'_>) -> GateResult {
        if ctx.comments_on_post >= u64::from(self.max_comments_per_post) {
            return GateResult::skipped();
        }
        let probability =
            Self::effective_comment_probability(ctx.bot.probabilities.comment, ctx.comments_on_post);
        if !self.rng.chance(probability) {
            return GateResult::skipped();
        }
        ctx.comment_gate_entered = true;

        match self.comment(ctx).await {
            Ok(()) => {
                info!(bot_id = ctx.bot.id, bot = %ctx.bot.name, post_id = ctx.post.id, "Commented on post");
                GateResult::taken()
            }
            Err(e) => {
                error!(bot_id = ctx.bot.id, post_id = ctx.post.id, error = %e, "Failed to comment on post");
                GateResult::skipped()
            }
        }
    }

    async fn comment(&self, ctx: &TickContext<'_>) -> Result<()> {
        let memories: Vec<String> = self
            .memory
            .recall(ctx.bot.id, &ctx.post.content, RECALL_LIMIT)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect();

        let text = self
            .content
            .comment(ctx.bot.category, &ctx.post_info, &memories)
            .await?;

        self.social
            .add_comment(
                ctx.post.id,
                &NewComment {
                    content: text.clone(),
                    user_id: ctx.remote_id,
                },
            )
            .await?;

        self.db
            .record_activity(
                &NewActivity::new(ctx.bot.id, ActivityType::Comment, &ctx.target_id)
                    .with_content(text),
            )
            .await?;
        Ok(())
    }

    async fn follow_gate(&self, ctx: &TickContext<'_>) -> GateResult {
        if !ctx.comment_gate_entered || ctx.has_followed {
            return GateResult::skipped();
        }
        let Some(author_id) = ctx.post.user.id else {
            return GateResult::skipped();
        };
        if author_id == ctx.remote_id
            || ctx.post.user.username.as_deref() == Some(ctx.bot.name.as_str())
        {
            return GateResult::skipped();
        }
        if !self.rng.chance(ctx.bot.probabilities.follow) {
            return GateResult::skipped();
        }

        match self.follow(ctx, author_id).await {
            Ok(_) => {
                info!(bot_id = ctx.bot.id, bot = %ctx.bot.name, author_id, "Followed post author");
                GateResult::finished()
            }
            Err(e) => {
                error!(bot_id = ctx.bot.id, author_id, error = %e, "Failed to follow user");
                GateResult::skipped()
            }
        }
    }

    async fn follow(&self, ctx: &TickContext<'_>, author_id: i64) -> Result<()> {
        self.social.follow_user(author_id, ctx.remote_id).await?;
        self.db
            .record_activity(&NewActivity::new(
                ctx.bot.id,
                ActivityType::Follow,
                author_id.to_string(),
            ))
            .await?;
        Ok(())
    }
}
