/// Sessions and access control
///
/// # Modules
///
/// - [`session`]: signed session tokens (HS256) and [`session::SessionUser`]
/// - [`cookie`]: session and OAuth state cookies, bearer tokens
/// - [`middleware`]: Axum layers that resolve or require a session
/// - [`authorization`]: delete policy for tasks and comments
///
/// Identity itself (the OAuth exchange) lives in the API crate; this module
/// only deals with what happens after the provider vouched for an email.

pub mod authorization;
pub mod cookie;
pub mod middleware;
pub mod session;
