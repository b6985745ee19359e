//! Worker endpoints: dashboard, exclusive claim, and assigned-ticket
//! management.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{ActionType, Comment, TicketPatch, TicketStatus};
use crate::services::reward_service::try_award;
use crate::state::AppState;

/// Resolutions inside this window of the ticket's creation earn the
/// quick-resolution bonus on top of the base award.
const QUICK_RESOLUTION_HOURS: i64 = 24;

pub fn create_worker_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/complaints/:id/claim", post(claim_complaint))
        .route("/complaints/:id", put(update_complaint))
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    current_user.require_worker()?;
    let assigned = state
        .tickets
        .list_tickets_for_worker(current_user.user_id)
        .await?;
    let global = state.tickets.status_counts(None).await?;

    let active = assigned.iter().filter(|t| t.status.is_open()).count();
    let resolved = assigned
        .iter()
        .filter(|t| t.status == TicketStatus::Resolved)
        .count();

    Ok(Json(json!({
        "assigned": assigned,
        "stats": {
            "assignedTotal": assigned.len(),
            "assignedActive": active,
            "assignedResolved": resolved,
            "global": global,
        },
    })))
}

/// Exclusive claim. Exactly one of any number of concurrent claimers wins;
/// the rest get 409 Conflict.
async fn claim_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    current_user.require_worker()?;

    let ticket = state
        .tickets
        .get_ticket(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("complaint {id}")))?;
    if ticket.assigned_to.is_some() {
        return Err(AppError::conflict("Complaint is already assigned"));
    }

    let outcome = state
        .tickets
        .claim_ticket(id, current_user.user_id, Utc::now())
        .await?;
    if !outcome.applied() {
        return Err(AppError::conflict("Complaint was claimed by another worker"));
    }
    info!("Complaint {} claimed by worker {}", id, current_user.user_id);

    let comment = Comment::system(
        format!("Complaint claimed by {}", current_user.name),
        Utc::now(),
    );
    state.tickets.append_comment(id, &comment).await?;

    let reward = try_award(
        &state.reward_service,
        current_user.user_id,
        ActionType::ClaimTicket,
        Some(id),
    )
    .await;

    Ok(Json(json!({
        "message": "Complaint claimed successfully",
        "reward": reward,
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct WorkerUpdateRequest {
    /// "in-progress" | "resolved" | "escalated"
    #[serde(default)]
    pub status: Option<String>,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub resolution: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    #[serde(default)]
    pub note: Option<String>,
}

async fn update_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<WorkerUpdateRequest>,
) -> Result<Json<Value>> {
    current_user.require_worker()?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let ticket = state
        .tickets
        .get_ticket(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("complaint {id}")))?;
    if ticket.assigned_to != Some(current_user.user_id) {
        return Err(AppError::authorization(
            "Only the assigned worker can update this complaint",
        ));
    }

    let now = Utc::now();
    let mut patch = TicketPatch::default();
    if let Some(raw) = req.status.as_deref() {
        let status = TicketStatus::parse(raw)
            .ok_or_else(|| AppError::validation(format!("Invalid status '{raw}'")))?;
        match status {
            TicketStatus::InProgress => patch.in_progress_at = Some(now),
            TicketStatus::Resolved => patch.resolved_at = Some(now),
            TicketStatus::Escalated => patch.escalated_at = Some(now),
            TicketStatus::Pending => {}
        }
        patch.status = Some(status);
    }
    patch.resolution = req.resolution;

    if patch.is_empty() && req.note.is_none() {
        return Err(AppError::bad_request("No changes supplied"));
    }

    let updated = if patch.is_empty() {
        ticket.clone()
    } else {
        state
            .tickets
            .update_ticket(id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("complaint {id}")))?
    };

    if let Some(note) = req.note {
        let comment = Comment::new(current_user.user_id, current_user.name.clone(), note);
        state.tickets.append_comment(id, &comment).await?;
    }

    // Rewards arrive only on the transition into resolved, never on repeats.
    let mut rewards = Vec::new();
    if updated.status == TicketStatus::Resolved && ticket.status != TicketStatus::Resolved {
        if let Some(outcome) = try_award(
            &state.reward_service,
            current_user.user_id,
            ActionType::ResolvedTicket,
            Some(id),
        )
        .await
        {
            rewards.push(outcome);
        }
        if now - ticket.created_at < Duration::hours(QUICK_RESOLUTION_HOURS) {
            if let Some(outcome) = try_award(
                &state.reward_service,
                current_user.user_id,
                ActionType::QuickResolution,
                Some(id),
            )
            .await
            {
                rewards.push(outcome);
            }
        }
    }

    Ok(Json(json!({
        "message": "Complaint updated",
        "complaint": updated,
        "rewards": rewards,
    })))
}
