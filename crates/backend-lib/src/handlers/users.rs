use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use sessiongate_common::PublicUser;

use crate::auth::SessionContext;
use crate::{error::AppError, AppState};

/// List every user's public fields. Requires a session.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    Ok(Json(state.auth.list_users(&session).await?))
}
