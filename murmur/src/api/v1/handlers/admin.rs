//! v1 Admin and stats handlers.

use axum::extract::State;

use crate::api::v1::dto::{ListTasksResponse, StatsResponse, TaskResponse};
use crate::api::v1::response::ApiResponse;
use crate::api::AppState;

/// Window used for the recent-activity count in `/stats`.
const RECENT_ACTIVITY_WINDOW: u32 = 100;

/// `GET /api/v1/stats`
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "admin",
    operation_id = "stats.get",
    responses(
        (status = 200, description = "Population and activity counts", body = StatsResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn stats(State(state): State<AppState>) -> ApiResponse<StatsResponse> {
    let total_bots = match state.db.count_bots().await {
        Ok(n) => n,
        Err(e) => return e.into(),
    };
    let bots_by_category = match state.db.count_bots_by_category().await {
        Ok(counts) => counts,
        Err(e) => return e.into(),
    };
    let recent = match state.db.list_recent_activities(RECENT_ACTIVITY_WINDOW).await {
        Ok(activities) => activities.len() as u64,
        Err(e) => return e.into(),
    };

    ApiResponse::success(StatsResponse {
        total_bots,
        bots_by_category,
        recent_activities: recent,
    })
}

/// `GET /api/v1/admin/tasks`
#[utoipa::path(
    get,
    path = "/api/v1/admin/tasks",
    tag = "admin",
    operation_id = "admin.tasks",
    responses(
        (status = 200, description = "Registered background tasks", body = ListTasksResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(State(state): State<AppState>) -> ApiResponse<ListTasksResponse> {
    ApiResponse::success(ListTasksResponse {
        running: state.scheduler.is_running(),
        tasks: state
            .scheduler
            .scheduled_tasks()
            .into_iter()
            .map(TaskResponse::from)
            .collect(),
    })
}
