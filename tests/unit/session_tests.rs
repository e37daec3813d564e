use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use sessiongate_backend::{
    auth::{
        DestroyOutcome, MemorySessionStore, Session, SessionManager, SessionState, SessionStore,
        SessionStoreError,
    },
    create_router,
    storage::{MemoryUserStore, User},
    AppState,
};

use crate::test_utils::{list_users, login, logout, register, test_settings};

fn sue() -> User {
    User {
        id: 1,
        username: "sue".to_string(),
        password: "$scrypt$placeholder".to_string(),
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let store = Arc::new(MemorySessionStore::new());
    let manager = SessionManager::new(store.clone(), Duration::from_secs(60));

    let ctx = manager.anonymous();
    assert_eq!(ctx.state(), SessionState::Anonymous);
    assert_eq!(ctx.destroy().await.unwrap(), DestroyOutcome::NoSession);

    ctx.create(sue()).await.unwrap();
    assert_eq!(ctx.state(), SessionState::Authenticated(sue()));
    assert_eq!(store.len(), 1);

    // A later request presenting the id sees the same principal
    let id = ctx.session_id().unwrap();
    let next_request = manager.context_for(Some(&id)).await.unwrap();
    assert_eq!(next_request.current(), Some(sue()));

    assert_eq!(next_request.destroy().await.unwrap(), DestroyOutcome::Destroyed);
    assert_eq!(next_request.state(), SessionState::Anonymous);
    assert!(store.is_empty());
    assert_eq!(next_request.destroy().await.unwrap(), DestroyOutcome::NoSession);
}

#[tokio::test]
async fn test_expired_session_is_anonymous() {
    let sessions = SessionManager::in_memory(Duration::from_millis(50));
    let state = Arc::new(AppState::with_sessions(
        Arc::new(MemoryUserStore::new()),
        sessions,
        test_settings(),
    ));
    let app = create_router(state);

    register(&app, "sue", "1234").await;
    let cookie = login(&app, "sue", "1234", None).await.cookie().unwrap();
    assert_eq!(list_users(&app, Some(&cookie)).await.status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let expired = list_users(&app, Some(&cookie)).await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert!(expired.clears_cookie());
}

#[tokio::test]
async fn test_cleanup_task_purges_expired_sessions() {
    let store = Arc::new(MemorySessionStore::new());
    let manager = SessionManager::new(store.clone(), Duration::from_millis(20));

    for _ in 0..3 {
        manager.anonymous().create(sue()).await.unwrap();
    }
    assert_eq!(store.len(), 3);

    let cleanup = manager.spawn_cleanup_task(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(150)).await;
    cleanup.abort();

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_huge_ttl_does_not_break_login() {
    let mut settings = test_settings();
    settings.session.ttl_secs = 1_000_000_000_000_000;
    assert!(settings.validate().is_err());

    // Bypass validation the way an embedding caller could
    let sessions = SessionManager::in_memory(settings.session_ttl());
    let state = Arc::new(AppState::with_sessions(
        Arc::new(MemoryUserStore::new()),
        sessions,
        settings,
    ));
    let app = create_router(state);

    register(&app, "sue", "1234").await;
    let response = login(&app, "sue", "1234", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.cookie().unwrap();
    assert_eq!(list_users(&app, Some(&cookie)).await.status, StatusCode::OK);
}

/// Session store that can save and load but never remove
#[derive(Default)]
struct StuckSessionStore(MemorySessionStore);

#[async_trait]
impl SessionStore for StuckSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        self.0.load(id).await
    }
    async fn save(&self, id: &str, session: Session) -> Result<(), SessionStoreError> {
        self.0.save(id, session).await
    }
    async fn remove(&self, _id: &str) -> Result<bool, SessionStoreError> {
        Err(SessionStoreError::Unavailable("session backend offline".to_string()))
    }
    async fn purge_expired(&self) -> Result<usize, SessionStoreError> {
        self.0.purge_expired().await
    }
}

#[tokio::test]
async fn test_logout_teardown_failure_keeps_session() {
    let sessions = SessionManager::new(
        Arc::new(StuckSessionStore::default()),
        Duration::from_secs(60),
    );
    let state = Arc::new(AppState::with_sessions(
        Arc::new(MemoryUserStore::new()),
        sessions,
        test_settings(),
    ));
    let app = create_router(state);

    register(&app, "sue", "1234").await;
    let cookie = login(&app, "sue", "1234", None).await.cookie().unwrap();

    let out = logout(&app, Some(&cookie)).await;
    assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(out.body, json!({ "message": "failed to end the session" }));
    assert!(out.set_cookie.is_none());

    // Still logged in
    let users = list_users(&app, Some(&cookie)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body, json!([{ "id": 1, "username": "sue" }]));
}
