use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Murmur API",
        version = "1.0.0",
        description = "Simulated social network population. Inspect bots, their activity and memories, and trigger reactions.",
    ),
    paths(
        handlers::health::health_check,
        handlers::bots::list_bots,
        handlers::bots::get_bot,
        handlers::bots::delete_bot,
        handlers::bots::list_bot_activities,
        handlers::bots::recall_memories,
        handlers::bots::react,
        handlers::bots::create_post,
        handlers::activities::recent_activities,
        handlers::admin::stats,
        handlers::admin::list_tasks,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Bots
        dto::bots::ProbabilitiesResponse,
        dto::bots::BotResponse,
        dto::bots::ListBotsResponse,
        dto::bots::DeleteBotResponse,
        dto::bots::MemoryHitResponse,
        dto::bots::RecallResponse,
        dto::bots::TickResponse,
        // Activities
        dto::activities::ActivityResponse,
        dto::activities::ListActivitiesResponse,
        // Admin
        dto::admin::StatsResponse,
        dto::admin::TaskResponse,
        dto::admin::ListTasksResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "bots", description = "Bot inspection, deletion, memories and on-demand reactions"),
        (name = "activities", description = "Activity history across all bots"),
        (name = "admin", description = "Population statistics and background tasks (auth required)"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
