//! Admin and stats DTOs for the v1 API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::TaskSnapshot;

/// Response for `GET /v1/stats`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_bots: u64,
    /// Bot count keyed by category name.
    pub bots_by_category: BTreeMap<String, u64>,
    /// Number of activities in the most recent window returned.
    pub recent_activities: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub task_id: String,
    pub next_run_at: DateTime<Utc>,
    /// Absent for one-shot tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

impl From<TaskSnapshot> for TaskResponse {
    fn from(task: TaskSnapshot) -> Self {
        Self {
            task_id: task.task_id,
            next_run_at: task.next_run,
            interval_secs: task.interval_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksResponse {
    pub running: bool,
    pub tasks: Vec<TaskResponse>,
}
