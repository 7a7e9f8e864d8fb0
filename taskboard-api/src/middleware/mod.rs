/// Middleware modules for the API server
///
/// Session resolution and the session-required guard live in
/// `taskboard_shared::auth::middleware`; this module holds the HTTP-only
/// layers.

pub mod security;
