use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::test_utils::{list_users, login, logout, register, send, send_raw, test_app};

#[tokio::test]
async fn test_register_login_list_logout() {
    let (app, _state) = test_app();

    let created = register(&app, "sue", "1234").await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body, json!({ "id": 1, "username": "sue" }));
    assert!(created.set_cookie.is_none());

    let logged_in = login(&app, "sue", "1234", None).await;
    assert_eq!(logged_in.status, StatusCode::OK);
    assert_eq!(logged_in.message(), "welcome sue");
    let cookie = logged_in.cookie().expect("login sets a session cookie");
    assert!(cookie.starts_with("sid="));
    let set_cookie = logged_in.set_cookie.as_deref().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=86400"));

    let users = list_users(&app, Some(&cookie)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body, json!([{ "id": 1, "username": "sue" }]));

    let out = logout(&app, Some(&cookie)).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.message(), "logged out");
    assert!(out.clears_cookie());

    let after = list_users(&app, Some(&cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.message(), "unauthorized");
}

#[tokio::test]
async fn test_users_requires_session() {
    let (app, _state) = test_app();
    register(&app, "sue", "1234").await;

    let response = list_users(&app, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "message": "unauthorized" }));
}

#[tokio::test]
async fn test_logout_without_session_is_not_an_error() {
    let (app, _state) = test_app();

    let first = logout(&app, None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.message(), "no session found");
    assert!(first.set_cookie.is_none());

    // Twice in a row behaves the same
    let second = logout(&app, None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.message(), "no session found");
}

#[tokio::test]
async fn test_register_rejections() {
    let (app, _state) = test_app();
    register(&app, "sue", "1234").await;

    let taken = register(&app, "sue", "abcd").await;
    assert_eq!(taken.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(taken.message(), "username already in use");

    let short = register(&app, "bob", "123").await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(short.message(), "password must exceed 3 characters");

    let blank = register(&app, "", "1234").await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(blank.message(), "username is required");

    let missing = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({ "username": "bob" })),
        None,
    )
    .await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing.message(), "password must exceed 3 characters");

    // Nothing but the first registration was stored
    let cookie = login(&app, "sue", "1234", None).await.cookie().unwrap();
    let users = list_users(&app, Some(&cookie)).await;
    assert_eq!(users.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let (app, _state) = test_app();
    register(&app, "sue", "1234").await;

    let unknown = login(&app, "nobody", "1234", None).await;
    let wrong = login(&app, "sue", "wrong", None).await;
    let short = login(&app, "sue", "1", None).await;

    for response in [&unknown, &wrong, &short] {
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.set_cookie.is_none());
    }
    assert_eq!(unknown.body, json!({ "message": "invalid credentials" }));
    assert_eq!(unknown.body, wrong.body);
    assert_eq!(wrong.body, short.body);
}

#[tokio::test]
async fn test_users_never_exposes_password_hashes() {
    let (app, _state) = test_app();
    register(&app, "sue", "1234").await;
    register(&app, "bob", "abcd").await;

    let cookie = login(&app, "bob", "abcd", None).await.cookie().unwrap();
    let users = list_users(&app, Some(&cookie)).await;
    assert_eq!(users.status, StatusCode::OK);

    let users = users.body.as_array().unwrap().clone();
    assert_eq!(users.len(), 2);
    for user in users {
        let fields = user.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("id"));
        assert!(fields.contains_key("username"));
    }
}

#[tokio::test]
async fn test_login_rotates_session_id() {
    let (app, _state) = test_app();
    register(&app, "sue", "1234").await;
    register(&app, "bob", "abcd").await;

    let first = login(&app, "sue", "1234", None).await.cookie().unwrap();
    let second = login(&app, "bob", "abcd", Some(&first)).await;
    assert_eq!(second.status, StatusCode::OK);
    let second = second.cookie().unwrap();
    assert_ne!(first, second);

    // The replaced id no longer authenticates
    let stale = list_users(&app, Some(&first)).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    assert!(stale.clears_cookie());

    assert_eq!(list_users(&app, Some(&second)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_cookie_is_anonymous_and_cleared() {
    let (app, _state) = test_app();

    let response = list_users(&app, Some("sid=not-a-real-session")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.clears_cookie());

    let out = logout(&app, Some("sid=not-a-real-session")).await;
    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.message(), "no session found");
}

#[tokio::test]
async fn test_concurrent_duplicate_registration() {
    let (app, _state) = test_app();

    let attempts = (0..6).map(|_| register(&app, "sue", "1234"));
    let responses = futures_util::future::join_all(attempts).await;

    let created = responses
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    for rejected in responses.iter().filter(|r| r.status != StatusCode::CREATED) {
        assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(rejected.message(), "username already in use");
    }
}

#[tokio::test]
async fn test_unreadable_body_gets_message_shape() {
    let (app, _state) = test_app();

    let malformed = send_raw(&app, "/register", Some("application/json"), "{not json").await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(!malformed.message().is_empty());

    let untyped = send_raw(&app, "/login", None, "username=sue&password=1234").await;
    assert_eq!(untyped.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(!untyped.message().is_empty());

    let wrong_type = send_raw(
        &app,
        "/login",
        Some("application/json"),
        r#"{"username": 7, "password": "1234"}"#,
    )
    .await;
    assert_eq!(wrong_type.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!wrong_type.message().is_empty());
    assert!(wrong_type.set_cookie.is_none());
}
