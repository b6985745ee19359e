//! Ledger and claim scenarios over the in-memory store.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use complaint_ws::models::{ActionType, PointsCatalog, Role, Ticket, TicketPriority, User};
use complaint_ws::services::notification_service::LogNotifier;
use complaint_ws::services::RewardService;
use complaint_ws::store::{MemoryStore, RewardStore, TicketStore};

fn service(store: &Arc<MemoryStore>) -> RewardService {
    RewardService::new(
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        PointsCatalog::default(),
    )
}

fn seed_user(store: &MemoryStore, name: &str, points: i64) -> User {
    let mut user = User::new(name, format!("{name}@example.com"), Role::User);
    user.reward_points = points;
    store.add_user(user.clone());
    user
}

#[tokio::test]
async fn ticket_lifecycle_accumulates_a_consistent_ledger() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "ava", 0);
    let ticket = Ticket::new(user.id, "Noise complaint", "...", "noise", TicketPriority::High);
    store.add_ticket(ticket.clone());
    let svc = service(&store);

    // create (10 + 15 high bonus), then owner resolves (20 + 15)
    let create = svc
        .award(user.id, "create_ticket", Some(ticket.id))
        .await
        .unwrap();
    assert_eq!(create.points, 25);

    let resolve = svc
        .award(user.id, "resolved_ticket", Some(ticket.id))
        .await
        .unwrap();
    assert_eq!(resolve.points, 35);
    assert_eq!(resolve.total_points, 60);

    // Cached total equals the transaction sum at every step.
    assert_eq!(store.transaction_sum(user.id), 60);
    let cached = RewardStore::get_user(store.as_ref(), user.id)
        .await
        .unwrap()
        .unwrap()
        .reward_points;
    assert_eq!(cached, 60);

    let history = RewardStore::list_transactions(store.as_ref(), user.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn concurrent_awards_never_lose_points() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "bo", 0);
    let svc = Arc::new(service(&store));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let svc = Arc::clone(&svc);
        let user_id = user.id;
        handles.push(tokio::spawn(async move {
            svc.award(user_id, "feedback", None).await.unwrap();
        }));
    }
    for result in join_all(handles).await {
        result.unwrap();
    }

    assert_eq!(store.transaction_sum(user.id), 100);
    let cached = RewardStore::get_user(store.as_ref(), user.id)
        .await
        .unwrap()
        .unwrap()
        .reward_points;
    assert_eq!(cached, 100, "cached total drifted from the ledger");
}

#[tokio::test]
async fn level_progression_is_reported_exactly_once_per_boundary() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "cleo", 95);
    let svc = service(&store);

    let crossing = svc.award(user.id, "claim_ticket", None).await.unwrap();
    assert_eq!(crossing.total_points, 100);
    assert!(crossing.leveled_up);
    assert_eq!(crossing.new_level.as_deref(), Some("Support Specialist"));

    let within = svc.award(user.id, "claim_ticket", None).await.unwrap();
    assert_eq!(within.total_points, 105);
    assert!(!within.leveled_up);
}

#[tokio::test]
async fn leaderboard_ranks_by_cached_total_and_skips_zero_balances() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "idle", 0);
    let mid = seed_user(&store, "mid", 250);
    let top = seed_user(&store, "top", 1200);
    let svc = service(&store);

    let board = svc.leaderboard(10).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].id, top.id);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[0].level, "Support Master");
    assert_eq!(board[1].id, mid.id);
    assert_eq!(board[1].level, "Support Specialist");
}

#[tokio::test]
async fn admin_goodwill_award_lands_in_the_ledger() {
    let store = Arc::new(MemoryStore::new());
    let admin = User::new("root", "root@example.com", Role::Admin);
    store.add_user(admin.clone());
    let user = seed_user(&store, "dana", 10);
    let svc = service(&store);

    let outcome = svc
        .award_manual(admin.id, user.id, 50, "Compensation for repeated outage", None)
        .await
        .unwrap();
    assert_eq!(outcome.total_points, 60);

    let history = RewardStore::list_transactions(store.as_ref(), user.id)
        .await
        .unwrap();
    assert_eq!(history[0].action_type, ActionType::AdminAward);
    assert_eq!(history[0].awarded_by, Some(admin.id));
}

#[tokio::test]
async fn exactly_one_concurrent_claimer_wins() {
    let store = Arc::new(MemoryStore::new());
    let reporter = seed_user(&store, "eve", 0);
    let ticket = Ticket::new(reporter.id, "Flooding", "...", "drainage", TicketPriority::High);
    store.add_ticket(ticket.clone());

    let workers: Vec<Uuid> = (0..8)
        .map(|i| {
            let worker = User::new(
                format!("worker{i}"),
                format!("worker{i}@example.com"),
                Role::Worker,
            );
            store.add_user(worker.clone());
            worker.id
        })
        .collect();

    let mut handles = Vec::new();
    for worker_id in workers {
        let store = Arc::clone(&store);
        let ticket_id = ticket.id;
        handles.push(tokio::spawn(async move {
            store
                .claim_ticket(ticket_id, worker_id, Utc::now())
                .await
                .unwrap()
        }));
    }

    let wins = join_all(handles)
        .await
        .into_iter()
        .filter(|result| result.as_ref().unwrap().applied())
        .count();
    assert_eq!(wins, 1, "claim must be exclusive");

    let after = store.get_ticket(ticket.id).await.unwrap().unwrap();
    assert!(after.assigned_to.is_some());
}
