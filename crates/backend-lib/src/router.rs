// ============================
// sessiongate-backend/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::session_lookup;
use crate::AppState;

/// Create the HTTP router.
///
/// Session lookup wraps every route, so handlers and gates always see a
/// populated `SessionContext`.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/users", get(handlers::list_users))
        .layer(middleware::from_fn_with_state(state.clone(), session_lookup))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
