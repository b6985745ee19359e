//! In-memory store used by the test suite and for running the service
//! without a database. One lock guards all collections so cross-collection
//! operations (award append + balance increment) stay atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Comment, Feedback, RewardLevel, RewardTransaction, StatusCounts, StatusUpdate, Ticket,
    TicketPatch, TicketStatus, User,
};
use crate::store::{FeedbackStore, RewardStore, TicketStore};

#[derive(Default)]
struct Inner {
    tickets: HashMap<Uuid, Ticket>,
    users: HashMap<Uuid, User>,
    transactions: Vec<RewardTransaction>,
    levels: Vec<RewardLevel>,
    feedback: Vec<Feedback>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed helper for tests and local runs.
    pub fn add_user(&self, user: User) {
        self.inner.write().users.insert(user.id, user);
    }

    /// Seed helper for tests and local runs.
    pub fn add_ticket(&self, ticket: Ticket) {
        self.inner.write().tickets.insert(ticket.id, ticket);
    }

    /// Sum of the ledger entries for one user; tests compare this against
    /// the cached total.
    pub fn transaction_sum(&self, user_id: Uuid) -> i64 {
        self.inner
            .read()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.points)
            .sum()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.inner.write().tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        Ok(self.inner.read().tickets.get(&id).cloned())
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .inner
            .read()
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn list_tickets_for_worker(&self, worker_id: Uuid) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .inner
            .read()
            .tickets
            .values()
            .filter(|t| t.assigned_to == Some(worker_id))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn list_all_tickets(&self) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self.inner.read().tickets.values().cloned().collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn list_open_tickets(
        &self,
        cursor: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .inner
            .read()
            .tickets
            .values()
            .filter(|t| t.status.is_open())
            .filter(|t| cursor.map_or(true, |c| (t.created_at, t.id) > c))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        tickets.truncate(limit.max(0) as usize);
        Ok(tickets)
    }

    async fn conditional_update_status(
        &self,
        id: Uuid,
        expected: &[TicketStatus],
        new_status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate> {
        let mut inner = self.inner.write();
        let Some(ticket) = inner.tickets.get_mut(&id) else {
            return Ok(StatusUpdate::Conflict);
        };
        if !expected.contains(&ticket.status) {
            return Ok(StatusUpdate::Conflict);
        }
        ticket.status = new_status;
        ticket.updated_at = at;
        match new_status {
            TicketStatus::InProgress => ticket.in_progress_at = Some(at),
            TicketStatus::Resolved => ticket.resolved_at = Some(at),
            TicketStatus::Escalated => ticket.escalated_at = Some(at),
            TicketStatus::Pending => {}
        }
        Ok(StatusUpdate::Applied)
    }

    async fn claim_ticket(
        &self,
        id: Uuid,
        worker_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate> {
        let mut inner = self.inner.write();
        let Some(ticket) = inner.tickets.get_mut(&id) else {
            return Ok(StatusUpdate::Conflict);
        };
        if ticket.assigned_to.is_some() || !ticket.status.is_open() {
            return Ok(StatusUpdate::Conflict);
        }
        ticket.assigned_to = Some(worker_id);
        ticket.assigned_at = Some(at);
        ticket.updated_at = at;
        Ok(StatusUpdate::Applied)
    }

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch) -> Result<Option<Ticket>> {
        let mut inner = self.inner.write();
        let Some(ticket) = inner.tickets.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(priority) = patch.priority {
            ticket.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            ticket.assigned_to = Some(assigned_to);
        }
        if let Some(resolution) = patch.resolution {
            ticket.resolution = Some(resolution);
        }
        if let Some(at) = patch.assigned_at {
            ticket.assigned_at = Some(at);
        }
        if let Some(at) = patch.in_progress_at {
            ticket.in_progress_at = Some(at);
        }
        if let Some(at) = patch.resolved_at {
            ticket.resolved_at = Some(at);
        }
        if let Some(at) = patch.escalated_at {
            ticket.escalated_at = Some(at);
        }
        ticket.updated_at = Utc::now();
        Ok(Some(ticket.clone()))
    }

    async fn append_comment(&self, ticket_id: Uuid, comment: &Comment) -> Result<()> {
        let mut inner = self.inner.write();
        let ticket = inner
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::not_found(format!("ticket {ticket_id}")))?;
        ticket.comments.push(comment.clone());
        ticket.updated_at = comment.created_at;
        Ok(())
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool> {
        Ok(self.inner.write().tickets.remove(&id).is_some())
    }

    async fn status_counts(&self, user_id: Option<Uuid>) -> Result<StatusCounts> {
        let inner = self.inner.read();
        let mut counts = StatusCounts::default();
        for ticket in inner.tickets.values() {
            if user_id.map_or(false, |uid| ticket.user_id != uid) {
                continue;
            }
            counts.total += 1;
            match ticket.status {
                TicketStatus::Pending => counts.pending += 1,
                TicketStatus::InProgress => counts.in_progress += 1,
                TicketStatus::Resolved => counts.resolved += 1,
                TicketStatus::Escalated => counts.escalated += 1,
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl RewardStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        self.inner.write().users.insert(user.id, user.clone());
        Ok(())
    }

    async fn apply_award(&self, entry: &RewardTransaction) -> Result<i64> {
        let mut inner = self.inner.write();
        let Some(user) = inner.users.get_mut(&entry.user_id) else {
            return Err(AppError::not_found(format!("user {}", entry.user_id)));
        };
        user.reward_points += entry.points;
        let new_total = user.reward_points;
        inner.transactions.push(entry.clone());
        Ok(new_total)
    }

    async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<RewardTransaction>> {
        let mut txns: Vec<RewardTransaction> = self
            .inner
            .read()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        txns.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(txns)
    }

    async fn top_users(&self, limit: i64) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .inner
            .read()
            .users
            .values()
            .filter(|u| u.reward_points > 0)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.reward_points.cmp(&a.reward_points));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn list_levels(&self) -> Result<Vec<RewardLevel>> {
        let mut levels = self.inner.read().levels.clone();
        levels.sort_by_key(|l| l.min_points);
        Ok(levels)
    }

    async fn insert_level(&self, level: &RewardLevel) -> Result<()> {
        self.inner.write().levels.push(level.clone());
        Ok(())
    }

    async fn update_level(&self, level: &RewardLevel) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.levels.iter_mut().find(|l| l.id == level.id) {
            Some(existing) => {
                *existing = level.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_level(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write();
        let before = inner.levels.len();
        inner.levels.retain(|l| l.id != id);
        Ok(inner.levels.len() < before)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.inner.write().feedback.push(feedback.clone());
        Ok(())
    }

    async fn list_feedback_for_user(&self, user_id: Uuid) -> Result<Vec<Feedback>> {
        let mut items: Vec<Feedback> = self
            .inner
            .read()
            .feedback
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn list_all_feedback(&self) -> Result<Vec<Feedback>> {
        let mut items = self.inner.read().feedback.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}
