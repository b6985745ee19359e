//! Postgres-backed store. Plain `sqlx::query`/`query_as` with explicit
//! binds; enum fields are stored as their wire strings and converted at
//! this boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{
    ActionType, Comment, Feedback, FeedbackKind, RewardLevel, RewardTransaction, StatusCounts,
    StatusUpdate, Ticket, TicketPatch, TicketPriority, TicketStatus, User,
};
use crate::store::{FeedbackStore, RewardStore, TicketStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, ticket_id, author_id, author_name, body, is_system, created_at
            FROM ticket_comments
            WHERE ticket_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

// ======================================================================
// ROW TYPES
// ======================================================================

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    subject: String,
    description: String,
    category: String,
    subcategory: String,
    status: String,
    priority: String,
    user_id: Uuid,
    assigned_to: Option<Uuid>,
    resolution: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assigned_at: Option<DateTime<Utc>>,
    in_progress_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    escalated_at: Option<DateTime<Utc>>,
}

fn ticket_from_row(row: TicketRow) -> Result<Ticket> {
    let status = TicketStatus::parse(&row.status)
        .ok_or_else(|| AppError::internal(format!("unknown ticket status '{}'", row.status)))?;
    let priority = TicketPriority::parse(&row.priority)
        .ok_or_else(|| AppError::internal(format!("unknown ticket priority '{}'", row.priority)))?;
    Ok(Ticket {
        id: row.id,
        subject: row.subject,
        description: row.description,
        category: row.category,
        subcategory: row.subcategory,
        status,
        priority,
        user_id: row.user_id,
        assigned_to: row.assigned_to,
        resolution: row.resolution,
        created_at: row.created_at,
        updated_at: row.updated_at,
        assigned_at: row.assigned_at,
        in_progress_at: row.in_progress_at,
        resolved_at: row.resolved_at,
        escalated_at: row.escalated_at,
        comments: Vec::new(),
    })
}

fn tickets_from_rows(rows: Vec<TicketRow>) -> Result<Vec<Ticket>> {
    rows.into_iter().map(ticket_from_row).collect()
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    #[allow(dead_code)]
    ticket_id: Uuid,
    author_id: Option<Uuid>,
    author_name: String,
    body: String,
    is_system: bool,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            author_id: row.author_id,
            author_name: row.author_name,
            body: row.body,
            is_system: row.is_system,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    reward_points: i64,
    created_at: DateTime<Utc>,
}

fn user_from_row(row: UserRow) -> Result<User> {
    let role = crate::models::Role::parse(&row.role)
        .ok_or_else(|| AppError::internal(format!("unknown role '{}'", row.role)))?;
    Ok(User {
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        role,
        reward_points: row.reward_points,
        created_at: row.created_at,
    })
}

#[derive(FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    points: i64,
    action_type: String,
    ticket_id: Option<Uuid>,
    awarded_by: Option<Uuid>,
    description: String,
    created_at: DateTime<Utc>,
}

fn transaction_from_row(row: TransactionRow) -> Result<RewardTransaction> {
    let action_type = ActionType::parse(&row.action_type)
        .ok_or_else(|| AppError::internal(format!("unknown action type '{}'", row.action_type)))?;
    Ok(RewardTransaction {
        id: row.id,
        user_id: row.user_id,
        points: row.points,
        action_type,
        ticket_id: row.ticket_id,
        awarded_by: row.awarded_by,
        description: row.description,
        timestamp: row.created_at,
    })
}

#[derive(FromRow)]
struct LevelRow {
    id: Uuid,
    name: String,
    min_points: i64,
    max_points: Option<i64>,
    benefits: Vec<String>,
    badge_color: String,
}

impl From<LevelRow> for RewardLevel {
    fn from(row: LevelRow) -> Self {
        RewardLevel {
            id: row.id,
            name: row.name,
            min_points: row.min_points,
            max_points: row.max_points,
            benefits: row.benefits,
            badge_color: row.badge_color,
        }
    }
}

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    message: String,
    kind: String,
    rating: Option<i32>,
    ticket_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
}

fn feedback_from_row(row: FeedbackRow) -> Result<Feedback> {
    let kind = match row.kind.as_str() {
        "general" => FeedbackKind::General,
        "bug" => FeedbackKind::Bug,
        "feature" => FeedbackKind::Feature,
        "complaint" => FeedbackKind::Complaint,
        other => return Err(AppError::internal(format!("unknown feedback kind '{other}'"))),
    };
    Ok(Feedback {
        id: row.id,
        user_id: row.user_id,
        user_name: row.user_name,
        message: row.message,
        kind,
        rating: row.rating,
        ticket_id: row.ticket_id,
        status: row.status,
        created_at: row.created_at,
    })
}

fn feedback_kind_str(kind: FeedbackKind) -> &'static str {
    match kind {
        FeedbackKind::General => "general",
        FeedbackKind::Bug => "bug",
        FeedbackKind::Feature => "feature",
        FeedbackKind::Complaint => "complaint",
    }
}

// ======================================================================
// TICKET STORE
// ======================================================================

const TICKET_COLUMNS: &str = "id, subject, description, category, subcategory, status, priority, \
     user_id, assigned_to, resolution, created_at, updated_at, assigned_at, in_progress_at, \
     resolved_at, escalated_at";

#[async_trait]
impl TicketStore for PgStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets
                (id, subject, description, category, subcategory, status, priority,
                 user_id, assigned_to, resolution, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(&ticket.category)
        .bind(&ticket.subcategory)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.user_id)
        .bind(ticket.assigned_to)
        .bind(&ticket.resolution)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut ticket = ticket_from_row(row)?;
                ticket.comments = self.load_comments(id).await?;
                Ok(Some(ticket))
            }
            None => Ok(None),
        }
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        tickets_from_rows(rows)
    }

    async fn list_tickets_for_worker(&self, worker_id: Uuid) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE assigned_to = $1 ORDER BY created_at DESC"
        ))
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;
        tickets_from_rows(rows)
    }

    async fn list_all_tickets(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        tickets_from_rows(rows)
    }

    async fn list_open_tickets(
        &self,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            SELECT {TICKET_COLUMNS} FROM tickets
            WHERE status IN ('pending', 'in-progress')
              AND ($1::timestamptz IS NULL OR (created_at, id) > ($1, $2))
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#
        ))
        .bind(cursor.map(|(at, _)| at))
        .bind(cursor.map(|(_, id)| id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        tickets_from_rows(rows)
    }

    async fn conditional_update_status(
        &self,
        id: Uuid,
        expected: &[TicketStatus],
        new_status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        // The transition timestamp column depends on the target status, so
        // the statement is selected rather than built dynamically.
        let sql = match new_status {
            TicketStatus::InProgress => {
                "UPDATE tickets SET status = $1, in_progress_at = $2, updated_at = $2
                 WHERE id = $3 AND status = ANY($4)"
            }
            TicketStatus::Resolved => {
                "UPDATE tickets SET status = $1, resolved_at = $2, updated_at = $2
                 WHERE id = $3 AND status = ANY($4)"
            }
            TicketStatus::Escalated => {
                "UPDATE tickets SET status = $1, escalated_at = $2, updated_at = $2
                 WHERE id = $3 AND status = ANY($4)"
            }
            TicketStatus::Pending => {
                "UPDATE tickets SET status = $1, updated_at = $2
                 WHERE id = $3 AND status = ANY($4)"
            }
        };

        let result = sqlx::query(sql)
            .bind(new_status.as_str())
            .bind(at)
            .bind(id)
            .bind(&expected)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            Ok(StatusUpdate::Applied)
        } else {
            Ok(StatusUpdate::Conflict)
        }
    }

    async fn claim_ticket(
        &self,
        id: Uuid,
        worker_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET assigned_to = $1, assigned_at = $2, updated_at = $2
            WHERE id = $3
              AND assigned_to IS NULL
              AND status IN ('pending', 'in-progress')
            "#,
        )
        .bind(worker_id)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(StatusUpdate::Applied)
        } else {
            Ok(StatusUpdate::Conflict)
        }
    }

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch) -> Result<Option<Ticket>> {
        let result = sqlx::query(
            r#"
            UPDATE tickets SET
                status = COALESCE($2, status),
                priority = COALESCE($3, priority),
                assigned_to = COALESCE($4, assigned_to),
                resolution = COALESCE($5, resolution),
                assigned_at = COALESCE($6, assigned_at),
                in_progress_at = COALESCE($7, in_progress_at),
                resolved_at = COALESCE($8, resolved_at),
                escalated_at = COALESCE($9, escalated_at),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.priority.map(|p| p.as_str()))
        .bind(patch.assigned_to)
        .bind(&patch.resolution)
        .bind(patch.assigned_at)
        .bind(patch.in_progress_at)
        .bind(patch.resolved_at)
        .bind(patch.escalated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_ticket(id).await
    }

    async fn append_comment(&self, ticket_id: Uuid, comment: &Comment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_comments
                (id, ticket_id, author_id, author_name, body, is_system, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(comment.id)
        .bind(ticket_id)
        .bind(comment.author_id)
        .bind(&comment.author_name)
        .bind(&comment.body)
        .bind(comment.is_system)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE tickets SET updated_at = $2 WHERE id = $1")
            .bind(ticket_id)
            .bind(comment.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn status_counts(&self, user_id: Option<Uuid>) -> Result<StatusCounts> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM tickets
            WHERE $1::uuid IS NULL OR user_id = $1
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            counts.total += count;
            match TicketStatus::parse(&status) {
                Some(TicketStatus::Pending) => counts.pending = count,
                Some(TicketStatus::InProgress) => counts.in_progress = count,
                Some(TicketStatus::Resolved) => counts.resolved = count,
                Some(TicketStatus::Escalated) => counts.escalated = count,
                None => {}
            }
        }
        Ok(counts)
    }
}

// ======================================================================
// REWARD STORE
// ======================================================================

#[async_trait]
impl RewardStore for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, phone, role, reward_points, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, role, reward_points, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.reward_points)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply_award(&self, entry: &RewardTransaction) -> Result<i64> {
        // Transaction append and balance increment commit or fail together.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reward_transactions
                (id, user_id, points, action_type, ticket_id, awarded_by, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.points)
        .bind(entry.action_type.as_str())
        .bind(entry.ticket_id)
        .bind(entry.awarded_by)
        .bind(&entry.description)
        .bind(entry.timestamp)
        .execute(&mut *tx)
        .await?;

        let new_total: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET reward_points = reward_points + $2 WHERE id = $1
             RETURNING reward_points",
        )
        .bind(entry.user_id)
        .bind(entry.points)
        .fetch_optional(&mut *tx)
        .await?;

        match new_total {
            Some(total) => {
                tx.commit().await?;
                Ok(total)
            }
            None => {
                tx.rollback().await?;
                Err(AppError::not_found(format!("user {}", entry.user_id)))
            }
        }
    }

    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<RewardTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, user_id, points, action_type, ticket_id, awarded_by, description, created_at
            FROM reward_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn top_users(&self, limit: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, phone, role, reward_points, created_at
            FROM users
            WHERE reward_points > 0
            ORDER BY reward_points DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(user_from_row).collect()
    }

    async fn list_levels(&self) -> Result<Vec<RewardLevel>> {
        let rows = sqlx::query_as::<_, LevelRow>(
            "SELECT id, name, min_points, max_points, benefits, badge_color
             FROM reward_levels ORDER BY min_points ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RewardLevel::from).collect())
    }

    async fn insert_level(&self, level: &RewardLevel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reward_levels (id, name, min_points, max_points, benefits, badge_color)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(level.id)
        .bind(&level.name)
        .bind(level.min_points)
        .bind(level.max_points)
        .bind(&level.benefits)
        .bind(&level.badge_color)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_level(&self, level: &RewardLevel) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reward_levels
            SET name = $2, min_points = $3, max_points = $4, benefits = $5, badge_color = $6
            WHERE id = $1
            "#,
        )
        .bind(level.id)
        .bind(&level.name)
        .bind(level.min_points)
        .bind(level.max_points)
        .bind(&level.benefits)
        .bind(&level.badge_color)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_level(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reward_levels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ======================================================================
// FEEDBACK STORE
// ======================================================================

#[async_trait]
impl FeedbackStore for PgStore {
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback
                (id, user_id, user_name, message, kind, rating, ticket_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(feedback.id)
        .bind(feedback.user_id)
        .bind(&feedback.user_name)
        .bind(&feedback.message)
        .bind(feedback_kind_str(feedback.kind))
        .bind(feedback.rating)
        .bind(feedback.ticket_id)
        .bind(&feedback.status)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_feedback_for_user(&self, user_id: Uuid) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT id, user_id, user_name, message, kind, rating, ticket_id, status, created_at
            FROM feedback
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(feedback_from_row).collect()
    }

    async fn list_all_feedback(&self) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT id, user_id, user_name, message, kind, rating, ticket_id, status, created_at
            FROM feedback
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(feedback_from_row).collect()
    }
}
