// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Account handlers.
//!
//! ```text
//! POST /register {"username":"sue","password":"1234"}  -> 201 {"id":1,"username":"sue"}
//! POST /login    {"username":"sue","password":"1234"}  -> 200 {"message":"welcome sue"}
//! GET  /logout                                         -> 200 {"message":"logged out"}
//! ```
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use sessiongate_common::{Credentials, MessageBody, PublicUser};

use crate::auth::SessionContext;
use crate::{error::AppError, AppState};

/// Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let Json(credentials) = body?;
    let user = state.auth.register(credentials).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Verify credentials and establish a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<MessageBody>, AppError> {
    let Json(credentials) = body?;
    let user = state.auth.login(credentials, &session).await?;
    Ok(Json(MessageBody::new(format!("welcome {}", user.username))))
}

/// End the session. Logging out twice is fine.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<MessageBody>, AppError> {
    let outcome = state.auth.logout(&session).await?;
    Ok(Json(MessageBody::new(outcome.message())))
}
