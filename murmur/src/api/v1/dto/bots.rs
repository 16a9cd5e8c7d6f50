//! Bot request/response DTOs for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{self, ActionProbabilities, MemoryHit};
use crate::services::TickReport;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /v1/bots`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListBotsQuery {
    /// Number of bots to skip.
    pub skip: Option<u32>,
    /// Maximum results per page (default 20, max 100).
    pub limit: Option<u32>,
}

/// Query parameters for `GET /v1/bots/{botId}/memories`.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RecallQuery {
    /// Text to find related memories for.
    pub query: String,
    /// Maximum memories to return (default 5, max 50).
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilitiesResponse {
    pub like: f64,
    pub comment: f64,
    pub follow: f64,
    pub unfollow: f64,
    pub post: f64,
}

impl From<ActionProbabilities> for ProbabilitiesResponse {
    fn from(p: ActionProbabilities) -> Self {
        Self {
            like: p.like,
            comment: p.comment,
            follow: p.follow,
            unfollow: p.unfollow,
            post: p.post,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BotResponse {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub age: u32,
    pub gender: String,
    /// One of `fan`, `hater`, `silent`, `random`, `neutral`, `humorous`,
    /// `provocative`, `role_player`.
    pub category: String,
    pub description: String,
    pub prompt: String,
    pub probabilities: ProbabilitiesResponse,
    /// User id on the social network; absent while the bot is unlinked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
    /// Next time the bot is eligible to act.
    pub next_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<models::Bot> for BotResponse {
    fn from(bot: models::Bot) -> Self {
        Self {
            id: bot.id,
            name: bot.name,
            full_name: bot.full_name,
            avatar: bot.avatar,
            age: bot.age,
            gender: bot.gender.as_str().to_string(),
            category: bot.category.as_str().to_string(),
            description: bot.description,
            prompt: bot.prompt_template,
            probabilities: bot.probabilities.into(),
            remote_id: bot.remote_id,
            next_active_at: bot.last_active,
            created_at: bot.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListBotsResponse {
    pub bots: Vec<BotResponse>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBotResponse {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHitResponse {
    pub text: String,
    #[schema(value_type = Object)]
    pub metadata: models::Metadata,
    /// Higher is closer to the query.
    pub relevance: f32,
}

impl From<MemoryHit> for MemoryHitResponse {
    fn from(hit: MemoryHit) -> Self {
        Self {
            text: hit.text,
            metadata: hit.metadata,
            relevance: hit.relevance,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecallResponse {
    pub memories: Vec<MemoryHitResponse>,
}

/// Result of `POST /v1/bots/{botId}/react`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TickResponse {
    pub bot_id: i64,
    /// `no_recent_posts`, `no_action`, `success` or `followed`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followed_user_id: Option<i64>,
}

impl From<TickReport> for TickResponse {
    fn from(report: TickReport) -> Self {
        Self {
            bot_id: report.bot_id,
            outcome: report.outcome.as_str().to_string(),
            post_id: report.post_id,
            followed_user_id: report.followed_user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TickOutcome;

    #[test]
    fn tick_response_serializes_camel_case() {
        let resp = TickResponse::from(TickReport {
            bot_id: 3,
            outcome: TickOutcome::Followed,
            post_id: Some(9),
            followed_user_id: Some(12),
        });
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["botId"], 3);
        assert_eq!(json["outcome"], "followed");
        assert_eq!(json["followedUserId"], 12);
    }

    #[test]
    fn list_query_accepts_missing_fields() {
        let query: ListBotsQuery = serde_json::from_str("{}").expect("deserialize");
        assert!(query.skip.is_none());
        assert!(query.limit.is_none());
    }
}
