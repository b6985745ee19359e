//! Storage boundary. The escalation sweeper and the reward ledger only ever
//! talk to these traits; Postgres backs them in production and the in-memory
//! store backs tests and local development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Comment, Feedback, RewardLevel, RewardTransaction, StatusCounts, StatusUpdate, Ticket,
    TicketPatch, TicketStatus, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Ticket with its comments, or `None`.
    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>>;

    async fn list_tickets_for_user(&self, user_id: Uuid) -> Result<Vec<Ticket>>;

    async fn list_tickets_for_worker(&self, worker_id: Uuid) -> Result<Vec<Ticket>>;

    async fn list_all_tickets(&self) -> Result<Vec<Ticket>>;

    /// One page of open (pending / in-progress) tickets ordered by
    /// `(created_at, id)`, strictly after `cursor`. The id tiebreak keeps
    /// the cursor total even when tickets share a creation timestamp.
    /// Comments are not loaded.
    async fn list_open_tickets(
        &self,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Ticket>>;

    /// Compare-and-swap status transition: applies only while the ticket is
    /// still in one of `expected`. Sets the matching transition timestamp
    /// and `updated_at` to `at`.
    async fn conditional_update_status(
        &self,
        id: Uuid,
        expected: &[TicketStatus],
        new_status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate>;

    /// Exclusive claim: succeeds only while the ticket is open and has no
    /// assignee. The losing side of a race observes `Conflict`.
    async fn claim_ticket(&self, id: Uuid, worker_id: Uuid, at: DateTime<Utc>)
        -> Result<StatusUpdate>;

    /// Unconditional field update used by the worker/admin management
    /// endpoints. Returns the updated ticket, or `None` if it vanished.
    async fn update_ticket(&self, id: Uuid, patch: TicketPatch) -> Result<Option<Ticket>>;

    async fn append_comment(&self, ticket_id: Uuid, comment: &Comment) -> Result<()>;

    /// Admin-only hard delete. Returns whether a ticket was removed.
    async fn delete_ticket(&self, id: Uuid) -> Result<bool>;

    /// Status breakdown, optionally scoped to one user's tickets.
    async fn status_counts(&self, user_id: Option<Uuid>) -> Result<StatusCounts>;
}

#[async_trait]
pub trait RewardStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Appends the transaction and increments the user's cached total as
    /// one atomic unit, returning the new total. Fails without partial
    /// effect if the user does not exist.
    async fn apply_award(&self, entry: &RewardTransaction) -> Result<i64>;

    /// All transactions for a user, newest first.
    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<RewardTransaction>>;

    /// Top users by cached total, excluding zero balances.
    async fn top_users(&self, limit: i64) -> Result<Vec<User>>;

    /// Level table ordered by ascending `min_points`.
    async fn list_levels(&self) -> Result<Vec<RewardLevel>>;

    async fn insert_level(&self, level: &RewardLevel) -> Result<()>;

    async fn update_level(&self, level: &RewardLevel) -> Result<bool>;

    async fn delete_level(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()>;

    async fn list_feedback_for_user(&self, user_id: Uuid) -> Result<Vec<Feedback>>;

    async fn list_all_feedback(&self) -> Result<Vec<Feedback>>;
}
