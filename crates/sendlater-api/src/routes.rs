//! API routes

use axum::routing::{delete, get, post};
use axum::Router;
use sendlater_core::{AuthSignal, BulkSender, FollowUpEngine, RateLimiter, Scheduler};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{bulk, health, rules, scheduled, status};

/// Shared handler state
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub engine: Arc<FollowUpEngine>,
    pub bulk_sender: Arc<BulkSender>,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth_signal: Arc<AuthSignal>,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let scheduled_routes = Router::new()
        .route("/", post(scheduled::enqueue).get(scheduled::list_pending))
        .route("/:id", delete(scheduled::cancel));

    let rule_routes = Router::new()
        .route("/", post(rules::create_rule).get(rules::list_rules))
        .route("/:id/toggle", post(rules::toggle_rule))
        .route("/:id", delete(rules::delete_rule));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1/scheduled", scheduled_routes)
        .nest("/api/v1/rules", rule_routes)
        .route("/api/v1/bulk", post(bulk::send_bulk))
        .route("/api/v1/budget", get(status::budget))
        .route("/api/v1/auth/status", get(status::auth_status))
        .route("/api/v1/auth/clear", post(status::clear_auth_signal))
        .route(
            "/api/v1/history/:message_id/replied",
            post(rules::record_reply),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
