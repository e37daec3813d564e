use axum::http::StatusCode;
use sessiongate_backend::config::{Settings, StorageBackend};
use tempfile::tempdir;

use crate::test_utils::{app_from_settings, list_users, login, register, test_settings};

#[test]
fn test_load_from_yaml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sessiongate.yaml");
    std::fs::write(
        &config_path,
        r#"
server:
  port: 8080
storage:
  backend: file
  path: /var/lib/sessiongate
session:
  cookie_name: auth
  secure_cookie: true
"#,
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.storage.backend, StorageBackend::File);
    assert_eq!(settings.session.cookie_name, "auth");
    assert!(settings.session.secure_cookie);
    // Untouched sections keep their defaults
    assert_eq!(settings.auth, Settings::default().auth);
}

#[test]
fn test_load_rejects_invalid_values() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sessiongate.yaml");
    std::fs::write(&config_path, "auth:\n  hash_cost: 99\n").unwrap();

    assert!(Settings::load_from(&config_path).is_err());
}

#[tokio::test]
async fn test_password_length_setting_reaches_register() {
    let mut settings = test_settings();
    settings.auth.min_password_length = 8;
    let (app, _state) = app_from_settings(settings);

    let short = register(&app, "sue", "1234567").await;
    assert_eq!(short.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(short.message(), "password must exceed 7 characters");

    assert_eq!(
        register(&app, "sue", "12345678").await.status,
        StatusCode::CREATED
    );
}

#[tokio::test]
async fn test_cookie_settings_reach_responses() {
    let mut settings = test_settings();
    settings.session.cookie_name = "auth".to_string();
    settings.session.secure_cookie = true;
    settings.session.ttl_secs = 600;
    let (app, _state) = app_from_settings(settings);

    register(&app, "sue", "1234").await;
    let response = login(&app, "sue", "1234", None).await;
    let set_cookie = response.set_cookie.clone().unwrap();
    assert!(set_cookie.starts_with("auth="));
    assert!(set_cookie.contains("Max-Age=600"));
    assert!(set_cookie.ends_with("; Secure"));

    let cookie = response.cookie().unwrap();
    assert_eq!(list_users(&app, Some(&cookie)).await.status, StatusCode::OK);

    // The default cookie name is ignored
    let renamed = cookie.replacen("auth=", "sid=", 1);
    assert_eq!(
        list_users(&app, Some(&renamed)).await.status,
        StatusCode::UNAUTHORIZED
    );
}
