//! Activity ledger DTOs for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models;

/// Query parameters for `GET /v1/bots/{botId}/activities`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListActivitiesQuery {
    /// Only this activity type (`like`, `comment`, `follow`, `unfollow`, `post`).
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub skip: Option<u32>,
    /// Maximum results per page (default 20, max 100).
    pub limit: Option<u32>,
}

/// Query parameters for `GET /v1/activities`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivitiesQuery {
    /// Maximum results (default 20, max 100).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: i64,
    pub bot_id: i64,
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Post id or user id on the social network, depending on the type.
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<models::Activity> for ActivityResponse {
    fn from(activity: models::Activity) -> Self {
        Self {
            id: activity.id,
            bot_id: activity.bot_id,
            activity_type: activity.activity_type.as_str().to_string(),
            target_id: activity.target_id,
            content: activity.content,
            created_at: activity.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListActivitiesResponse {
    pub activities: Vec<ActivityResponse>,
}
