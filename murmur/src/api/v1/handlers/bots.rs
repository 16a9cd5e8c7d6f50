//! v1 Bot handlers. Each is a thin passthrough to the population manager,
//! decision engine or memory bridge.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use crate::api::v1::dto::{
    page_limit, ActivityResponse, BotResponse, DeleteBotResponse, ListActivitiesQuery,
    ListActivitiesResponse, ListBotsQuery, ListBotsResponse, MemoryHitResponse, RecallQuery,
    RecallResponse, TickResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;
use crate::models::ActivityType;

const DEFAULT_RECALL_LIMIT: u32 = 5;
const MAX_RECALL_LIMIT: u32 = 50;

/// `GET /api/v1/bots`
#[utoipa::path(
    get,
    path = "/api/v1/bots",
    tag = "bots",
    operation_id = "bots.list",
    params(ListBotsQuery),
    responses(
        (status = 200, description = "Bots page", body = ListBotsResponse),
    )
)]
pub async fn list_bots(
    State(state): State<AppState>,
    Query(query): Query<ListBotsQuery>,
) -> ApiResponse<ListBotsResponse> {
    let skip = query.skip.unwrap_or(0);
    let limit = page_limit(query.limit);

    let bots = match state.db.list_bots(skip, limit).await {
        Ok(bots) => bots,
        Err(e) => return e.into(),
    };
    let total = match state.db.count_bots().await {
        Ok(total) => total,
        Err(e) => return e.into(),
    };

    ApiResponse::success_with_meta(
        ListBotsResponse {
            bots: bots.into_iter().map(BotResponse::from).collect(),
        },
        ResponseMeta {
            total: Some(total),
            skip: Some(skip),
            limit: Some(limit),
        },
    )
}

/// `GET /api/v1/bots/{botId}`
#[utoipa::path(
    get,
    path = "/api/v1/bots/{botId}",
    tag = "bots",
    operation_id = "bots.get",
    params(("botId" = i64, Path, description = "Local bot id")),
    responses(
        (status = 200, description = "Bot found", body = BotResponse),
        (status = 404, description = "Bot not found", body = ApiError),
    )
)]
pub async fn get_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
) -> ApiResponse<BotResponse> {
    match state.db.get_bot(bot_id).await {
        Ok(Some(bot)) => ApiResponse::success(bot.into()),
        Ok(None) => ApiResponse::error(ErrorCode::NotFound, format!("Bot {bot_id} not found")),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/bots/{botId}`
#[utoipa::path(
    delete,
    path = "/api/v1/bots/{botId}",
    tag = "bots",
    operation_id = "bots.delete",
    params(("botId" = i64, Path, description = "Local bot id")),
    responses(
        (status = 200, description = "Bot, its activities and its memories deleted", body = DeleteBotResponse),
        (status = 404, description = "Bot not found", body = ApiError),
    )
)]
pub async fn delete_bot(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
) -> ApiResponse<DeleteBotResponse> {
    match state.services.population.delete_bot(bot_id).await {
        Ok(true) => ApiResponse::success(DeleteBotResponse {
            id: bot_id,
            deleted: true,
        }),
        Ok(false) => ApiResponse::error(ErrorCode::NotFound, format!("Bot {bot_id} not found")),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/bots/{botId}/activities`
#[utoipa::path(
    get,
    path = "/api/v1/bots/{botId}/activities",
    tag = "bots",
    operation_id = "bots.activities",
    params(("botId" = i64, Path, description = "Local bot id"), ListActivitiesQuery),
    responses(
        (status = 200, description = "Activities, newest first", body = ListActivitiesResponse),
        (status = 400, description = "Unknown activity type", body = ApiError),
        (status = 404, description = "Bot not found", body = ApiError),
    )
)]
pub async fn list_bot_activities(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
    Query(query): Query<ListActivitiesQuery>,
) -> ApiResponse<ListActivitiesResponse> {
    let activity_type = match query.activity_type.as_deref().map(str::parse::<ActivityType>) {
        None => None,
        Some(Ok(t)) => Some(t),
        Some(Err(msg)) => return ApiResponse::error(ErrorCode::InvalidRequest, msg),
    };

    match state.db.get_bot(bot_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ApiResponse::error(ErrorCode::NotFound, format!("Bot {bot_id} not found"))
        }
        Err(e) => return e.into(),
    }

    let skip = query.skip.unwrap_or(0);
    let limit = page_limit(query.limit);
    match state
        .db
        .list_bot_activities(bot_id, activity_type, skip, limit)
        .await
    {
        Ok(activities) => ApiResponse::success_with_meta(
            ListActivitiesResponse {
                activities: activities.into_iter().map(ActivityResponse::from).collect(),
            },
            ResponseMeta {
                total: None,
                skip: Some(skip),
                limit: Some(limit),
            },
        ),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/bots/{botId}/memories`
#[utoipa::path(
    get,
    path = "/api/v1/bots/{botId}/memories",
    tag = "bots",
    operation_id = "bots.memories",
    params(("botId" = i64, Path, description = "Local bot id"), RecallQuery),
    responses(
        (status = 200, description = "Closest memories first", body = RecallResponse),
        (status = 400, description = "Empty query", body = ApiError),
        (status = 404, description = "Bot not found", body = ApiError),
    )
)]
pub async fn recall_memories(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
    Query(query): Query<RecallQuery>,
) -> ApiResponse<RecallResponse> {
    if query.query.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Query cannot be empty");
    }
    match state.db.get_bot(bot_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ApiResponse::error(ErrorCode::NotFound, format!("Bot {bot_id} not found"))
        }
        Err(e) => return e.into(),
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECALL_LIMIT)
        .clamp(1, MAX_RECALL_LIMIT);
    match state.services.memory.recall(bot_id, &query.query, limit).await {
        Ok(hits) => ApiResponse::success(RecallResponse {
            memories: hits.into_iter().map(MemoryHitResponse::from).collect(),
        }),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/bots/{botId}/react`
#[utoipa::path(
    post,
    path = "/api/v1/bots/{botId}/react",
    tag = "bots",
    operation_id = "bots.react",
    params(("botId" = i64, Path, description = "Local bot id")),
    responses(
        (status = 200, description = "Tick finished", body = TickResponse),
        (status = 400, description = "Bot is not linked to the social network", body = ApiError),
        (status = 404, description = "Bot not found", body = ApiError),
        (status = 409, description = "Bot is already being processed", body = ApiError),
    )
)]
pub async fn react(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
) -> ApiResponse<TickResponse> {
    match state.services.population.react(bot_id).await {
        Ok(report) => ApiResponse::success(report.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/bots/{botId}/post`
#[utoipa::path(
    post,
    path = "/api/v1/bots/{botId}/post",
    tag = "bots",
    operation_id = "bots.post",
    params(("botId" = i64, Path, description = "Local bot id")),
    responses(
        (status = 201, description = "Post published and recorded", body = ActivityResponse),
        (status = 400, description = "Bot is not linked to the social network", body = ApiError),
        (status = 404, description = "Bot not found", body = ApiError),
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Path(bot_id): Path<i64>,
) -> ApiResponse<ActivityResponse> {
    match state.services.population.create_bot_post(bot_id).await {
        Ok(activity) => ApiResponse::created(activity.into()),
        Err(e) => e.into(),
    }
}
