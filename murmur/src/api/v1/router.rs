use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let bots = Router::new()
        .route("/", get(handlers::bots::list_bots))
        .route(
            "/{botId}",
            get(handlers::bots::get_bot).delete(handlers::bots::delete_bot),
        )
        .route(
            "/{botId}/activities",
            get(handlers::bots::list_bot_activities),
        )
        .route("/{botId}/memories", get(handlers::bots::recall_memories))
        .route("/{botId}/react", post(handlers::bots::react))
        .route("/{botId}/post", post(handlers::bots::create_post));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .nest("/bots", bots)
        .route(
            "/activities",
            get(handlers::activities::recent_activities),
        )
        .route("/stats", get(handlers::admin::stats))
        .route("/admin/tasks", get(handlers::admin::list_tasks))
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
