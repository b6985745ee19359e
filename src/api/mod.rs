//! HTTP surface. Public reads (health, leaderboard, level table) sit
//! outside the auth layer; everything else requires a bearer token.

pub mod admin;
pub mod complaints;
pub mod feedback;
pub mod reward_levels;
pub mod rewards;
pub mod worker;

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::extract_current_user;
use crate::state::AppState;

pub fn create_app_router(state: AppState) -> Router {
    let public = Router::new().route("/health", get(health)).nest(
        "/api/rewards",
        rewards::create_public_rewards_router()
            .merge(reward_levels::create_public_levels_router()),
    );

    let protected = Router::new()
        .nest("/api/complaints", complaints::create_complaints_router())
        .nest("/api/worker", worker::create_worker_router())
        .nest("/api/admin", admin::create_admin_router())
        .nest(
            "/api/rewards",
            rewards::create_rewards_router().merge(reward_levels::create_levels_router()),
        )
        .nest("/api/feedback", feedback::create_feedback_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            extract_current_user,
        ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "complaint_ws",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
