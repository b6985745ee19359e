//! Complaint endpoints for end users, plus the manual escalation trigger.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{ActionType, Comment, Ticket, TicketPriority, TicketStatus};
use crate::services::notification_service::ticket_created_message;
use crate::services::reward_service::try_award;
use crate::state::AppState;

pub fn create_complaints_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_complaint).get(list_own_complaints))
        .route("/stats", get(own_stats))
        .route("/check-escalations", post(check_escalations))
        .route("/:id", get(get_complaint).delete(delete_complaint))
        .route("/:id/comments", post(add_comment))
        .route("/:id/resolve", post(resolve_complaint))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComplaintRequest {
    #[validate(length(min = 3, max = 200))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// "low" | "medium" | "high"; legacy "urgent" is accepted and mapped
    /// to high. Defaults to medium.
    #[serde(default)]
    pub priority: Option<String>,
}

async fn create_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let priority = match req.priority.as_deref() {
        None | Some("") => TicketPriority::Medium,
        Some(raw) => TicketPriority::from_input(raw)
            .ok_or_else(|| AppError::validation(format!("Invalid priority '{raw}'")))?,
    };

    let mut ticket = Ticket::new(
        current_user.user_id,
        req.subject,
        req.description,
        req.category,
        priority,
    );
    if let Some(subcategory) = req.subcategory {
        ticket.subcategory = subcategory;
    }
    state.tickets.insert_ticket(&ticket).await?;
    info!(
        "Complaint {} created by user {} with priority {}",
        ticket.id, current_user.user_id, ticket.priority
    );

    let (subject, body) = ticket_created_message(&ticket.id.to_string(), &ticket.subject);
    let notifier = Arc::clone(&state.notifier);
    let recipient = current_user.email.clone();
    tokio::spawn(async move {
        notifier.notify(&recipient, &subject, &body).await;
    });

    let reward = try_award(
        &state.reward_service,
        current_user.user_id,
        ActionType::CreateTicket,
        Some(ticket.id),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Complaint submitted successfully",
            "complaint": ticket,
            "reward": reward,
        })),
    ))
}

async fn list_own_complaints(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let complaints = state
        .tickets
        .list_tickets_for_user(current_user.user_id)
        .await?;
    Ok(Json(json!({
        "complaints": complaints,
        "count": complaints.len(),
    })))
}

async fn own_stats(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let counts = state.tickets.status_counts(Some(current_user.user_id)).await?;
    Ok(Json(json!({ "stats": counts })))
}

async fn get_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let ticket = load_visible_ticket(&state, &current_user, id).await?;
    Ok(Json(json!({ "complaint": ticket })))
}

async fn delete_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    if !state.tickets.delete_ticket(id).await? {
        return Err(AppError::not_found(format!("complaint {id}")));
    }
    info!("Complaint {} deleted by admin {}", id, current_user.user_id);
    Ok(Json(json!({ "message": "Complaint deleted" })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

async fn add_comment(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    load_visible_ticket(&state, &current_user, id).await?;

    let comment = Comment::new(current_user.user_id, current_user.name.clone(), req.body);
    state.tickets.append_comment(id, &comment).await?;
    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}

/// Owner confirms resolution. Conditional: loses quietly against a
/// concurrent resolution, with a 409 back to the caller.
async fn resolve_complaint(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let ticket = state
        .tickets
        .get_ticket(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("complaint {id}")))?;
    if ticket.user_id != current_user.user_id {
        return Err(AppError::authorization("Only the complaint owner can resolve it"));
    }

    let now = chrono::Utc::now();
    let expected = [
        TicketStatus::Pending,
        TicketStatus::InProgress,
        TicketStatus::Escalated,
    ];
    let outcome = state
        .tickets
        .conditional_update_status(id, &expected, TicketStatus::Resolved, now)
        .await?;
    if !outcome.applied() {
        return Err(AppError::conflict("Complaint is already resolved"));
    }

    let reward = try_award(
        &state.reward_service,
        current_user.user_id,
        ActionType::ResolvedTicket,
        Some(id),
    )
    .await;

    Ok(Json(json!({
        "message": "Complaint marked as resolved",
        "reward": reward,
    })))
}

/// Manual sweep trigger; same code path and result shape as the hourly job.
async fn check_escalations(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    let report = state.escalation.run_sweep().await?;
    Ok(Json(json!({
        "message": format!("Escalation check complete, {} complaint(s) escalated", report.escalated_count),
        "report": report,
    })))
}

async fn load_visible_ticket(
    state: &AppState,
    current_user: &CurrentUser,
    id: Uuid,
) -> Result<Ticket> {
    let ticket = state
        .tickets
        .get_ticket(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("complaint {id}")))?;
    let is_owner = ticket.user_id == current_user.user_id;
    let is_assignee = ticket.assigned_to == Some(current_user.user_id);
    if !(is_owner || is_assignee || current_user.is_admin()) {
        return Err(AppError::authorization("Not allowed to view this complaint"));
    }
    Ok(ticket)
}
