//! Service feedback endpoints. Submitting feedback earns points, and a
//! high rating on an assigned ticket feeds back into the worker's rewards.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
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
use crate::models::{ActionType, Feedback, FeedbackKind};
use crate::services::reward_service::try_award;
use crate::state::AppState;

/// Messages at least this long count as detailed feedback and earn the
/// higher award.
const DETAILED_FEEDBACK_CHARS: usize = 100;

pub fn create_feedback_router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_feedback).get(list_own_feedback))
        .route("/admin", get(list_all_feedback))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitFeedbackRequest {
    #[validate(length(min = 5, max = 5000))]
    pub message: String,
    #[serde(default)]
    pub kind: FeedbackKind,
    #[validate(range(min = 1, max = 5))]
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub ticket_id: Option<Uuid>,
}

async fn submit_feedback(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let feedback = Feedback::new(
        current_user.user_id,
        current_user.name.clone(),
        req.message.clone(),
        req.kind,
        req.rating,
        req.ticket_id,
    );
    state.feedback.insert_feedback(&feedback).await?;

    let action = if req.message.chars().count() >= DETAILED_FEEDBACK_CHARS {
        ActionType::DetailedFeedback
    } else {
        ActionType::Feedback
    };
    let reward = try_award(
        &state.reward_service,
        current_user.user_id,
        action,
        req.ticket_id,
    )
    .await;

    // A strong rating on an assigned ticket rewards the worker too.
    if let (Some(rating), Some(ticket_id)) = (req.rating, req.ticket_id) {
        if rating >= 4 {
            if let Some(ticket) = state.tickets.get_ticket(ticket_id).await? {
                if let Some(worker_id) = ticket.assigned_to {
                    let worker_action = if rating == 5 {
                        ActionType::FiveStarRating
                    } else {
                        ActionType::PositiveFeedback
                    };
                    try_award(&state.reward_service, worker_id, worker_action, Some(ticket_id))
                        .await;
                }
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Feedback submitted, thank you!",
            "feedback": feedback,
            "reward": reward,
        })),
    ))
}

async fn list_own_feedback(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let feedback = state
        .feedback
        .list_feedback_for_user(current_user.user_id)
        .await?;
    Ok(Json(json!({ "feedback": feedback })))
}

async fn list_all_feedback(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    let feedback = state.feedback.list_all_feedback().await?;
    Ok(Json(json!({
        "feedback": feedback,
        "count": feedback.len(),
    })))
}
