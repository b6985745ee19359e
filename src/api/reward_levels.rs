//! Level table CRUD. Every write is validated against the partition
//! invariant before it lands: tiers must cover 0.. with no gaps or
//! overlaps, and only the last tier may be unbounded.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{validate_level_table, RewardLevel};
use crate::state::AppState;

pub fn create_levels_router() -> Router<AppState> {
    Router::new()
        .route("/levels", post(create_level))
        .route("/levels/:id", put(update_level).delete(delete_level))
}

pub fn create_public_levels_router() -> Router<AppState> {
    Router::new().route("/levels", get(list_levels))
}

async fn list_levels(State(state): State<AppState>) -> Result<Json<Value>> {
    let levels = state.reward_service.list_levels().await?;
    Ok(Json(json!({ "levels": levels })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LevelRequest {
    #[serde(rename = "level")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0))]
    pub min_points: i64,
    #[serde(default)]
    pub max_points: Option<i64>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default = "default_badge_color")]
    pub badge_color: String,
}

fn default_badge_color() -> String {
    "#95a5a6".to_string()
}

async fn create_level(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<LevelRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    current_user.require_admin()?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let level = RewardLevel {
        id: Uuid::new_v4(),
        name: req.name,
        min_points: req.min_points,
        max_points: req.max_points,
        benefits: req.benefits,
        badge_color: req.badge_color,
    };

    let mut table = state.rewards.list_levels().await?;
    table.push(level.clone());
    table.sort_by_key(|l| l.min_points);
    validate_level_table(&table).map_err(AppError::validation)?;

    state.rewards.insert_level(&level).await?;
    info!("Reward level '{}' created by admin {}", level.name, current_user.user_id);
    Ok((StatusCode::CREATED, Json(json!({ "level": level }))))
}

async fn update_level(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<LevelRequest>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let level = RewardLevel {
        id,
        name: req.name,
        min_points: req.min_points,
        max_points: req.max_points,
        benefits: req.benefits,
        badge_color: req.badge_color,
    };

    let mut table = state.rewards.list_levels().await?;
    let slot = table
        .iter_mut()
        .find(|l| l.id == id)
        .ok_or_else(|| AppError::not_found(format!("level {id}")))?;
    *slot = level.clone();
    table.sort_by_key(|l| l.min_points);
    validate_level_table(&table).map_err(AppError::validation)?;

    if !state.rewards.update_level(&level).await? {
        return Err(AppError::not_found(format!("level {id}")));
    }
    Ok(Json(json!({ "level": level })))
}

async fn delete_level(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;

    let mut table = state.rewards.list_levels().await?;
    let before = table.len();
    table.retain(|l| l.id != id);
    if table.len() == before {
        return Err(AppError::not_found(format!("level {id}")));
    }
    validate_level_table(&table).map_err(|e| {
        AppError::validation(format!("Deleting this level would break the tier table: {e}"))
    })?;

    state.rewards.delete_level(id).await?;
    info!("Reward level {} deleted by admin {}", id, current_user.user_id);
    Ok(Json(json!({ "message": "Level deleted" })))
}
