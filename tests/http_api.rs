//! Router-level tests: auth middleware, role guards and the main complaint
//! flow, served against the in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use complaint_ws::config::Config;
use complaint_ws::middleware::auth::issue_token;
use complaint_ws::models::{Role, User};
use complaint_ws::services::notification_service::LogNotifier;
use complaint_ws::store::MemoryStore;
use complaint_ws::{create_app_router, AppState};

const JWT_SECRET: &str = "test-secret";

fn test_config() -> Config {
    let mut config = Config::from_env().expect("config from env");
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config
}

fn test_app(store: Arc<MemoryStore>) -> Router {
    let state = AppState::assemble(
        test_config(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(LogNotifier),
    );
    create_app_router(state)
}

fn bearer(user: &User) -> String {
    format!("Bearer {}", issue_token(user, JWT_SECRET, 1).unwrap())
}

fn json_request(method: &str, uri: &str, user: Option<&User>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, user: Option<&User>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn seed_user(store: &MemoryStore, role: Role) -> User {
    let user = User::new("Test User", format!("{}@example.com", Uuid::new_v4()), role);
    store.add_user(user.clone());
    user
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let store = Arc::new(MemoryStore::new());
    let app = test_app(store);

    let response = app
        .oneshot(get_request("/api/complaints", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_leaderboard_are_public() {
    let store = Arc::new(MemoryStore::new());
    let app = test_app(store);

    let health = app
        .clone()
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let board = app
        .oneshot(get_request("/api/rewards/leaderboard", None))
        .await
        .unwrap();
    assert_eq!(board.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_complaint_normalizes_urgent_and_awards_points() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, Role::User);
    let app = test_app(store.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/complaints",
            Some(&user),
            json!({
                "subject": "Water outage on 5th street",
                "description": "No running water since early this morning.",
                "category": "utilities",
                "priority": "urgent",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["complaint"]["priority"], "high");
    assert_eq!(body["reward"]["awarded"], true);
    // base 10 + high severity 15
    assert_eq!(body["reward"]["points"], 25);
    assert_eq!(store.transaction_sum(user.id), 25);
}

#[tokio::test]
async fn invalid_priority_is_rejected_before_mutation() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, Role::User);
    let app = test_app(store.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/complaints",
            Some(&user),
            json!({
                "subject": "Broken bench",
                "description": "The bench in the central park is broken.",
                "category": "parks",
                "priority": "catastrophic",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.transaction_sum(user.id), 0);
}

#[tokio::test]
async fn second_claim_gets_conflict() {
    let store = Arc::new(MemoryStore::new());
    let reporter = seed_user(&store, Role::User);
    let worker_a = seed_user(&store, Role::Worker);
    let worker_b = seed_user(&store, Role::Worker);
    let app = test_app(store.clone());

    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/complaints",
            Some(&reporter),
            json!({
                "subject": "Pothole on main road",
                "description": "Deep pothole near the crosswalk, growing weekly.",
                "category": "roads",
            }),
        ))
        .await
        .unwrap();
    let ticket_id = body_json(created).await["complaint"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let claim_uri = format!("/api/worker/complaints/{ticket_id}/claim");
    let first = app
        .clone()
        .oneshot(json_request("POST", &claim_uri, Some(&worker_a), json!({})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(json_request("POST", &claim_uri, Some(&worker_b), json!({})))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn claim_is_forbidden_for_plain_users() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, Role::User);
    let app = test_app(store);

    let uri = format!("/api/worker/complaints/{}/claim", Uuid::new_v4());
    let response = app
        .oneshot(json_request("POST", &uri, Some(&user), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn manual_sweep_endpoint_is_admin_only() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, Role::User);
    let admin = seed_user(&store, Role::Admin);
    let app = test_app(store);

    let denied = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/complaints/check-escalations",
            Some(&user),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = app
        .oneshot(json_request(
            "POST",
            "/api/complaints/check-escalations",
            Some(&admin),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    let body = body_json(allowed).await;
    assert_eq!(body["report"]["escalatedCount"], 0);
}

#[tokio::test]
async fn level_writes_that_break_the_partition_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let admin = seed_user(&store, Role::Admin);
    let app = test_app(store.clone());

    // Seed the default table first.
    let state_seed = AppState::assemble(
        test_config(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(LogNotifier),
    );
    state_seed
        .reward_service
        .ensure_default_levels()
        .await
        .unwrap();

    // A tier starting inside an existing one overlaps.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rewards/levels",
            Some(&admin),
            json!({
                "level": "Intermediate",
                "min_points": 50,
                "max_points": 150,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let levels = app
        .oneshot(get_request("/api/rewards/levels", None))
        .await
        .unwrap();
    let body = body_json(levels).await;
    assert_eq!(body["levels"].as_array().unwrap().len(), 5, "table unchanged");
}

#[tokio::test]
async fn feedback_awards_the_submitter_and_rates_the_worker() {
    let store = Arc::new(MemoryStore::new());
    let reporter = seed_user(&store, Role::User);
    let worker = seed_user(&store, Role::Worker);
    let app = test_app(store.clone());

    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/complaints",
            Some(&reporter),
            json!({
                "subject": "Trash not collected",
                "description": "Bins on the corner have not been emptied this week.",
                "category": "sanitation",
            }),
        ))
        .await
        .unwrap();
    let ticket_id = body_json(created).await["complaint"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let claim = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/worker/complaints/{ticket_id}/claim"),
            Some(&worker),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(claim.status(), StatusCode::OK);
    let worker_points_after_claim = store.transaction_sum(worker.id);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/feedback",
            Some(&reporter),
            json!({
                "message": "Resolved fast, very friendly service.",
                "rating": 5,
                "ticket_id": ticket_id,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["reward"]["points"], 5);
    // five_star_rating lands on the assignee
    assert_eq!(
        store.transaction_sum(worker.id),
        worker_points_after_claim + 25
    );
}
