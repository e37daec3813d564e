// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `sessiongate` HTTP server.

pub mod session;

pub use session::{session_cookie, session_id_from_headers, session_lookup};
