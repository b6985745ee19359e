//! Reward endpoints: the caller's own ledger view, the public leaderboard
//! and the admin manual award.

use axum::{
    extract::{Extension, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn create_rewards_router() -> Router<AppState> {
    Router::new()
        .route("/user", get(user_rewards))
        .route("/award", post(manual_award))
}

/// Leaderboard is mounted outside the auth layer; reads are public.
pub fn create_public_rewards_router() -> Router<AppState> {
    Router::new().route("/leaderboard", get(leaderboard))
}

async fn user_rewards(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let (total, transactions) = state
        .reward_service
        .user_transactions(current_user.user_id)
        .await?;
    let level = state.reward_service.user_level(current_user.user_id).await?;
    Ok(Json(json!({
        "totalPoints": total,
        "transactions": transactions,
        "levelInfo": level,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: i64,
}

fn default_leaderboard_limit() -> i64 {
    10
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Value>> {
    let limit = query.limit.clamp(1, 100);
    let entries = state.reward_service.leaderboard(limit).await?;
    Ok(Json(json!({ "leaderboard": entries })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ManualAwardRequest {
    pub user_id: Uuid,
    #[validate(range(min = -1000, max = 1000))]
    pub points: i64,
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
    #[serde(default)]
    pub ticket_id: Option<Uuid>,
}

async fn manual_award(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<ManualAwardRequest>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let outcome = state
        .reward_service
        .award_manual(
            current_user.user_id,
            req.user_id,
            req.points,
            &req.reason,
            req.ticket_id,
        )
        .await?;
    Ok(Json(json!({
        "message": "Points awarded",
        "reward": outcome,
    })))
}
