//! Escalation sweep: finds open tickets past their priority's SLA window
//! and transitions them to escalated. Runs from the hourly scheduler job
//! and from the admin trigger endpoint; both share this exact code path.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EscalationConfig;
use crate::error::Result;
use crate::models::{Comment, StatusUpdate, TicketPriority, TicketStatus};
use crate::services::notification_service::{ticket_escalated_message, Notifier};
use crate::store::{RewardStore, TicketStore};

/// Hours-to-escalate per priority. One canonical table.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub high_hours: i64,
    pub medium_hours: i64,
    pub low_hours: i64,
    pub page_size: i64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            high_hours: 24,
            medium_hours: 72,
            low_hours: 120,
            page_size: 200,
        }
    }
}

impl From<&EscalationConfig> for EscalationPolicy {
    fn from(config: &EscalationConfig) -> Self {
        Self {
            high_hours: config.high_hours,
            medium_hours: config.medium_hours,
            low_hours: config.low_hours,
            page_size: config.sweep_page_size,
        }
    }
}

impl EscalationPolicy {
    pub fn threshold_hours(&self, priority: TicketPriority) -> i64 {
        match priority {
            TicketPriority::High => self.high_hours,
            TicketPriority::Medium => self.medium_hours,
            TicketPriority::Low => self.low_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EscalatedTicketSummary {
    #[serde(rename = "complaintId")]
    pub ticket_id: Uuid,
    pub subject: String,
    pub priority: TicketPriority,
    #[serde(rename = "hoursOpen")]
    pub hours_open: f64,
    #[serde(rename = "thresholdHours")]
    pub threshold_hours: i64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SweepReport {
    #[serde(rename = "escalatedCount")]
    pub escalated_count: usize,
    pub escalated: Vec<EscalatedTicketSummary>,
}

pub struct EscalationService {
    tickets: Arc<dyn TicketStore>,
    users: Arc<dyn RewardStore>,
    notifier: Arc<dyn Notifier>,
    policy: EscalationPolicy,
}

impl EscalationService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        users: Arc<dyn RewardStore>,
        notifier: Arc<dyn Notifier>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            tickets,
            users,
            notifier,
            policy,
        }
    }

    pub async fn run_sweep(&self) -> Result<SweepReport> {
        self.run_sweep_at(Utc::now()).await
    }

    /// Sweep with an explicit clock, so the SLA math is testable.
    ///
    /// Open tickets are scanned in pages; each overdue ticket goes through
    /// a conditional status write, so a ticket resolved or escalated by
    /// someone else between our read and write is skipped silently. Only a
    /// store failure while listing aborts the sweep; per-ticket failures
    /// are logged and the scan continues.
    pub async fn run_sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let mut cursor: Option<(DateTime<Utc>, Uuid)> = None;

        info!("Running escalation sweep");

        loop {
            let batch = self.tickets.list_open_tickets(cursor, self.policy.page_size).await?;
            if batch.is_empty() {
                break;
            }
            cursor = batch.last().map(|t| (t.created_at, t.id));
            let batch_len = batch.len() as i64;

            for ticket in batch {
                let threshold_hours = self.policy.threshold_hours(ticket.priority);
                let elapsed = now.signed_duration_since(ticket.created_at);
                if elapsed < Duration::hours(threshold_hours) {
                    continue;
                }

                match self
                    .tickets
                    .conditional_update_status(ticket.id, &TicketStatus::OPEN, TicketStatus::Escalated, now)
                    .await
                {
                    Ok(StatusUpdate::Applied) => {
                        let hours_open = elapsed.num_seconds() as f64 / 3600.0;
                        self.record_escalation(&ticket, threshold_hours, hours_open, now)
                            .await;
                        report.escalated.push(EscalatedTicketSummary {
                            ticket_id: ticket.id,
                            subject: ticket.subject.clone(),
                            priority: ticket.priority,
                            hours_open,
                            threshold_hours,
                        });
                    }
                    Ok(StatusUpdate::Conflict) => {
                        // Someone resolved or escalated it between our read
                        // and write; already handled.
                        debug!("Ticket {} changed state mid-sweep, skipping", ticket.id);
                    }
                    Err(e) => {
                        error!("Failed to escalate ticket {}: {}", ticket.id, e);
                    }
                }
            }

            if batch_len < self.policy.page_size {
                break;
            }
        }

        report.escalated_count = report.escalated.len();
        if report.escalated_count > 0 {
            info!("Escalation sweep escalated {} tickets", report.escalated_count);
        } else {
            info!("Escalation sweep found nothing to escalate");
        }
        Ok(report)
    }

    /// Audit comment plus owner notification for one escalated ticket.
    /// Neither can fail the sweep, and the notification is dispatched on
    /// its own task so a slow notifier never stalls the scan.
    async fn record_escalation(
        &self,
        ticket: &crate::models::Ticket,
        threshold_hours: i64,
        hours_open: f64,
        now: DateTime<Utc>,
    ) {
        let comment = Comment::system(
            format!(
                "This complaint has been automatically escalated after {threshold_hours} hours \
                 without resolution ({hours_open:.1} hours open)."
            ),
            now,
        );
        if let Err(e) = self.tickets.append_comment(ticket.id, &comment).await {
            error!("Failed to append escalation comment to ticket {}: {}", ticket.id, e);
        }

        match self.users.get_user(ticket.user_id).await {
            Ok(Some(user)) => {
                let (subject, body) = ticket_escalated_message(
                    &ticket.id.to_string(),
                    &ticket.subject,
                    threshold_hours,
                );
                let notifier = Arc::clone(&self.notifier);
                let recipient = user.email;
                tokio::spawn(async move {
                    notifier.notify(&recipient, &subject, &body).await;
                });
            }
            Ok(None) => warn!("Owner {} of ticket {} not found", ticket.user_id, ticket.id),
            Err(e) => warn!("Failed to look up owner of ticket {}: {}", ticket.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ticket, TicketPriority, User};
    use crate::services::notification_service::LogNotifier;
    use crate::store::MemoryStore;

    fn service(store: &Arc<MemoryStore>) -> EscalationService {
        EscalationService::new(
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
            EscalationPolicy::default(),
        )
    }

    fn seeded_ticket(store: &MemoryStore, priority: TicketPriority, hours_old: i64) -> Ticket {
        let user = User::new("Reporter", "reporter@example.com", crate::models::Role::User);
        let mut ticket = Ticket::new(user.id, "Leaky pipe", "It drips", "plumbing", priority);
        ticket.created_at = Utc::now() - Duration::hours(hours_old);
        ticket.updated_at = ticket.created_at;
        store.add_user(user);
        store.add_ticket(ticket.clone());
        ticket
    }

    #[tokio::test]
    async fn overdue_high_priority_ticket_is_escalated_once() {
        let store = Arc::new(MemoryStore::new());
        let ticket = seeded_ticket(&store, TicketPriority::High, 25);
        let svc = service(&store);

        let report = svc.run_sweep().await.unwrap();
        assert_eq!(report.escalated_count, 1);
        assert_eq!(report.escalated[0].ticket_id, ticket.id);
        assert_eq!(report.escalated[0].threshold_hours, 24);

        let stored = TicketStore::get_ticket(store.as_ref(), ticket.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TicketStatus::Escalated);
        assert!(stored.escalated_at.is_some());
        assert_eq!(stored.comments.len(), 1);
        assert!(stored.comments[0].is_system);
        assert!(stored.comments[0].body.contains("24 hours"));
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let ticket = seeded_ticket(&store, TicketPriority::Medium, 80);
        let svc = service(&store);

        let first = svc.run_sweep().await.unwrap();
        let second = svc.run_sweep().await.unwrap();
        assert_eq!(first.escalated_count, 1);
        assert_eq!(second.escalated_count, 0);

        let stored = TicketStore::get_ticket(store.as_ref(), ticket.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.comments.len(), 1, "no duplicate system comment");
    }

    #[tokio::test]
    async fn tickets_inside_their_window_are_left_alone() {
        let store = Arc::new(MemoryStore::new());
        let high = seeded_ticket(&store, TicketPriority::High, 23);
        let low = seeded_ticket(&store, TicketPriority::Low, 100);
        let svc = service(&store);

        let report = svc.run_sweep().await.unwrap();
        assert_eq!(report.escalated_count, 0);
        for id in [high.id, low.id] {
            let stored = TicketStore::get_ticket(store.as_ref(), id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.status, TicketStatus::Pending);
        }
    }

    #[tokio::test]
    async fn concurrently_resolved_ticket_is_skipped_silently() {
        let store = Arc::new(MemoryStore::new());
        let ticket = seeded_ticket(&store, TicketPriority::High, 30);
        // Another actor resolves the ticket after the sweep would have read
        // it but before it writes.
        store
            .conditional_update_status(
                ticket.id,
                &TicketStatus::OPEN,
                TicketStatus::Resolved,
                Utc::now(),
            )
            .await
            .unwrap();

        let svc = service(&store);
        let report = svc.run_sweep().await.unwrap();
        assert_eq!(report.escalated_count, 0);

        let stored = TicketStore::get_ticket(store.as_ref(), ticket.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TicketStatus::Resolved);
        assert!(stored.comments.is_empty());
    }

    #[tokio::test]
    async fn threshold_boundary_escalates_at_exactly_the_window() {
        let store = Arc::new(MemoryStore::new());
        let ticket = seeded_ticket(&store, TicketPriority::High, 24);
        let svc = service(&store);

        let report = svc.run_sweep().await.unwrap();
        assert_eq!(report.escalated_count, 1);
        assert_eq!(report.escalated[0].ticket_id, ticket.id);
    }
}
