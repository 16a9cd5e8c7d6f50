//! v1 Activity handlers.

use axum::extract::State;
use axum_extra::extract::Query;

use crate::api::v1::dto::{
    page_limit, ActivityResponse, ListActivitiesResponse, RecentActivitiesQuery,
};
use crate::api::v1::response::ApiResponse;
use crate::api::AppState;

/// `GET /api/v1/activities`
#[utoipa::path(
    get,
    path = "/api/v1/activities",
    tag = "activities",
    operation_id = "activities.recent",
    params(RecentActivitiesQuery),
    responses(
        (status = 200, description = "Most recent activities across all bots", body = ListActivitiesResponse),
    )
)]
pub async fn recent_activities(
    State(state): State<AppState>,
    Query(query): Query<RecentActivitiesQuery>,
) -> ApiResponse<ListActivitiesResponse> {
    match state
        .db
        .list_recent_activities(page_limit(query.limit))
        .await
    {
        Ok(activities) => ApiResponse::success(ListActivitiesResponse {
            activities: activities.into_iter().map(ActivityResponse::from).collect(),
        }),
        Err(e) => e.into(),
    }
}
