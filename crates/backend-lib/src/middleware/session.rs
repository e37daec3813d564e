//! Session lookup: resolves the session cookie into a `SessionContext`
//! before any handler or gate runs, and writes the cookie back afterwards.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::CookieChange;
use crate::config::SessionSettings;
use crate::{error::AppError, AppState};

/// Session lookup middleware.
///
/// Handlers receive the context through `Extension<SessionContext>`.
pub async fn session_lookup(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let settings = &state.settings.session;
    let session_id = session_id_from_headers(request.headers(), &settings.cookie_name);

    let session = state.sessions.context_for(session_id.as_deref()).await?;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if let Some(cookie) = session_cookie(&session.cookie_change(), settings, state.sessions.ttl()) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Extract the session id from the request's `Cookie` headers
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Render the `Set-Cookie` value for a cookie change, if one is needed
pub fn session_cookie(
    change: &CookieChange,
    settings: &SessionSettings,
    ttl: Duration,
) -> Option<HeaderValue> {
    let secure = if settings.secure_cookie { "; Secure" } else { "" };
    let cookie = match change {
        CookieChange::Unchanged => return None,
        CookieChange::Issue(id) => format!(
            "{}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
            settings.cookie_name,
            ttl.as_secs()
        ),
        CookieChange::Clear => format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{secure}",
            settings.cookie_name
        ),
    };

    match HeaderValue::from_str(&cookie) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "session cookie is not a valid header value");
            None
        },
    }
}
