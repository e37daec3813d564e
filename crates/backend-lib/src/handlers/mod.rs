//! HTTP handlers. Each one delegates to `AuthService` and only shapes the response.

mod auth;
mod users;

pub use auth::{login, logout, register};
pub use users::list_users;
