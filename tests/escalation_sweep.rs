//! End-to-end sweep scenarios over the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use complaint_ws::models::{Role, Ticket, TicketPriority, TicketStatus, User};
use complaint_ws::services::notification_service::LogNotifier;
use complaint_ws::services::{EscalationPolicy, EscalationService};
use complaint_ws::store::{MemoryStore, TicketStore};

fn service_with(store: &Arc<MemoryStore>, policy: EscalationPolicy) -> EscalationService {
    EscalationService::new(store.clone(), store.clone(), Arc::new(LogNotifier), policy)
}

fn seed_user(store: &MemoryStore) -> User {
    let user = User::new("Reporter", "reporter@example.com", Role::User);
    store.add_user(user.clone());
    user
}

fn aged_ticket(
    store: &MemoryStore,
    user: &User,
    priority: TicketPriority,
    hours_old: i64,
) -> Ticket {
    let mut ticket = Ticket::new(user.id, "Street light out", "...", "utilities", priority);
    ticket.created_at = Utc::now() - Duration::hours(hours_old);
    ticket.updated_at = ticket.created_at;
    store.add_ticket(ticket.clone());
    ticket
}

#[tokio::test]
async fn high_priority_past_twenty_four_hours_escalates() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);
    let ticket = aged_ticket(&store, &user, TicketPriority::High, 25);
    let svc = service_with(&store, EscalationPolicy::default());

    let report = svc.run_sweep().await.unwrap();
    assert_eq!(report.escalated_count, 1);
    assert_eq!(report.escalated[0].ticket_id, ticket.id);

    let after = store.get_ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(after.status, TicketStatus::Escalated);
    assert!(after.escalated_at.is_some());

    let system_comments: Vec<_> = after.comments.iter().filter(|c| c.is_system).collect();
    assert_eq!(system_comments.len(), 1);
    assert!(system_comments[0].body.contains("escalated"));
}

#[tokio::test]
async fn thresholds_are_keyed_by_priority() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);
    // 48h old: past the high window, inside medium and low windows.
    let high = aged_ticket(&store, &user, TicketPriority::High, 48);
    let medium = aged_ticket(&store, &user, TicketPriority::Medium, 48);
    let low = aged_ticket(&store, &user, TicketPriority::Low, 48);
    let svc = service_with(&store, EscalationPolicy::default());

    let report = svc.run_sweep().await.unwrap();
    assert_eq!(report.escalated_count, 1);

    let store_ref = &store;
    let status = |id: Uuid| async move {
        store_ref.get_ticket(id).await.unwrap().unwrap().status
    };
    assert_eq!(status(high.id).await, TicketStatus::Escalated);
    assert_eq!(status(medium.id).await, TicketStatus::Pending);
    assert_eq!(status(low.id).await, TicketStatus::Pending);
}

#[tokio::test]
async fn repeated_sweeps_do_not_double_escalate() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);
    let ticket = aged_ticket(&store, &user, TicketPriority::Medium, 80);
    let svc = service_with(&store, EscalationPolicy::default());

    assert_eq!(svc.run_sweep().await.unwrap().escalated_count, 1);
    assert_eq!(svc.run_sweep().await.unwrap().escalated_count, 0);
    assert_eq!(svc.run_sweep().await.unwrap().escalated_count, 0);

    let after = store.get_ticket(ticket.id).await.unwrap().unwrap();
    let audit: Vec<_> = after.comments.iter().filter(|c| c.is_system).collect();
    assert_eq!(audit.len(), 1, "exactly one audit comment after three sweeps");
}

#[tokio::test]
async fn backlog_larger_than_one_page_is_fully_scanned() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);
    // 7 overdue tickets against a page size of 3 forces three pages.
    for _ in 0..7 {
        aged_ticket(&store, &user, TicketPriority::High, 30);
    }
    aged_ticket(&store, &user, TicketPriority::High, 1);

    let policy = EscalationPolicy {
        page_size: 3,
        ..EscalationPolicy::default()
    };
    let svc = service_with(&store, policy);

    let report = svc.run_sweep().await.unwrap();
    assert_eq!(report.escalated_count, 7);
}

#[tokio::test]
async fn tickets_sharing_a_creation_timestamp_all_escalate() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);
    // Bulk imports can land several tickets on the exact same timestamp.
    // With a page size of 1 every page boundary falls inside the tie, so
    // a timestamp-only cursor would skip all but the first.
    let created_at = Utc::now() - Duration::hours(30);
    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut ticket =
            Ticket::new(user.id, "Street light out", "...", "utilities", TicketPriority::High);
        ticket.created_at = created_at;
        ticket.updated_at = created_at;
        ids.push(ticket.id);
        store.add_ticket(ticket);
    }

    let policy = EscalationPolicy {
        page_size: 1,
        ..EscalationPolicy::default()
    };
    let svc = service_with(&store, policy);

    let report = svc.run_sweep().await.unwrap();
    assert_eq!(report.escalated_count, 3);
    for id in ids {
        let after = store.get_ticket(id).await.unwrap().unwrap();
        assert_eq!(after.status, TicketStatus::Escalated);
    }
}

#[tokio::test]
async fn resolved_and_escalated_tickets_are_not_considered() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);

    let mut resolved = aged_ticket(&store, &user, TicketPriority::High, 50);
    resolved.status = TicketStatus::Resolved;
    store.add_ticket(resolved.clone());

    let mut escalated = aged_ticket(&store, &user, TicketPriority::High, 50);
    escalated.status = TicketStatus::Escalated;
    store.add_ticket(escalated.clone());

    let svc = service_with(&store, EscalationPolicy::default());
    let report = svc.run_sweep().await.unwrap();
    assert_eq!(report.escalated_count, 0);
}

#[tokio::test]
async fn claimed_in_progress_tickets_still_escalate() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store);
    let worker = User::new("Worker", "worker@example.com", Role::Worker);
    store.add_user(worker.clone());

    let ticket = aged_ticket(&store, &user, TicketPriority::Medium, 100);
    store
        .claim_ticket(ticket.id, worker.id, Utc::now())
        .await
        .unwrap();
    store
        .conditional_update_status(
            ticket.id,
            &[TicketStatus::Pending],
            TicketStatus::InProgress,
            Utc::now(),
        )
        .await
        .unwrap();

    let svc = service_with(&store, EscalationPolicy::default());
    let report = svc.run_sweep().await.unwrap();
    assert_eq!(report.escalated_count, 1);

    let after = store.get_ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(after.status, TicketStatus::Escalated);
    // The assignment survives escalation.
    assert_eq!(after.assigned_to, Some(worker.id));
}
