//! Admin endpoints: full ticket listing, global stats and the management
//! update that can touch status, priority, assignment and resolution in one
//! call.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Comment, TicketPatch, TicketPriority, TicketStatus};
use crate::state::AppState;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/complaints", get(list_all_complaints))
        .route("/complaints/:id/manage", put(manage_complaint))
        .route("/stats", get(global_stats))
}

async fn list_all_complaints(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    let complaints = state.tickets.list_all_tickets().await?;
    Ok(Json(json!({
        "complaints": complaints,
        "count": complaints.len(),
    })))
}

async fn global_stats(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    let counts = state.tickets.status_counts(None).await?;
    Ok(Json(json!({ "stats": counts })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ManageComplaintRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub resolution: Option<String>,
}

/// One update, one system comment summarizing everything that changed.
async fn manage_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ManageComplaintRequest>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let now = Utc::now();
    let mut patch = TicketPatch::default();
    let mut changes = Vec::new();

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
        changes.push(format!("status to {status}"));
    }
    if let Some(raw) = req.priority.as_deref() {
        let priority = TicketPriority::parse(raw)
            .ok_or_else(|| AppError::validation(format!("Invalid priority '{raw}'")))?;
        patch.priority = Some(priority);
        changes.push(format!("priority to {priority}"));
    }
    if let Some(worker_id) = req.assigned_to {
        state
            .rewards
            .get_user(worker_id)
            .await?
            .filter(|u| u.role.can_work_tickets())
            .ok_or_else(|| AppError::validation(format!("{worker_id} is not a worker")))?;
        patch.assigned_to = Some(worker_id);
        patch.assigned_at = Some(now);
        changes.push(format!("assignee to {worker_id}"));
    }
    if let Some(resolution) = req.resolution {
        patch.resolution = Some(resolution);
        changes.push("resolution".to_string());
    }

    if patch.is_empty() {
        return Err(AppError::bad_request("No changes supplied"));
    }

    let updated = state
        .tickets
        .update_ticket(id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(format!("complaint {id}")))?;
    info!(
        "Complaint {} managed by admin {}: {}",
        id,
        current_user.user_id,
        changes.join(", ")
    );

    let comment = Comment::system(
        format!("Admin updated {}", changes.join(", ")),
        now,
    );
    state.tickets.append_comment(id, &comment).await?;

    Ok(Json(json!({
        "message": "Complaint updated",
        "complaint": updated,
    })))
}
