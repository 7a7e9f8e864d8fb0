/// Session middleware for Axum
///
/// Two layers cooperate:
///
/// - **Session resolution** runs on every route. It reads the session token
///   (bearer header or session cookie), validates it and inserts a
///   [`SessionContext`] into the request extensions. A missing, expired or
///   forged token simply yields an anonymous context; pages decide for
///   themselves what anonymous visitors get.
/// - **Session required** guards mutation routes and answers 401 when the
///   context is anonymous.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::{self, Next}, routing::post, Extension, Router};
/// use taskboard_shared::auth::middleware::{
///     require_session_middleware, session_middleware, SessionContext,
/// };
///
/// async fn handler(Extension(session): Extension<SessionContext>) -> String {
///     session.user().map(|u| u.name.clone()).unwrap_or_default()
/// }
///
/// let secret = "a-secret-of-at-least-thirty-two-bytes!".to_string();
/// let app: Router = Router::new()
///     .route("/mutate", post(handler))
///     .layer(middleware::from_fn(require_session_middleware))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         session_middleware(secret.clone(), req, next)
///     }));
/// ```

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::cookie::session_token;
use super::session::{validate_token, SessionError, SessionUser};

/// Session of the current request, added to request extensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext(pub Option<SessionUser>);

impl SessionContext {
    pub fn signed_in(user: SessionUser) -> Self {
        Self(Some(user))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.0.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.email.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.0.is_some()
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// No valid session on a route that needs one
    MissingSession,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingSession => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Sign in required",
                })),
            )
                .into_response(),
        }
    }
}

/// Resolves the session carried by a request
///
/// Invalid tokens are logged and treated as absent.
pub fn resolve_session(headers: &HeaderMap, secret: &str) -> SessionContext {
    let Some(token) = session_token(headers) else {
        return SessionContext::anonymous();
    };

    match validate_token(token, secret) {
        Ok(claims) => SessionContext::signed_in(claims.user()),
        Err(SessionError::Expired) => {
            tracing::debug!("Session token expired");
            SessionContext::anonymous()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
            SessionContext::anonymous()
        }
    }
}

/// Session resolution middleware
///
/// Always continues to the next handler; the [`SessionContext`] extension
/// tells it whether someone is signed in.
pub async fn session_middleware(secret: String, mut req: Request, next: Next) -> Response {
    let session = resolve_session(req.headers(), &secret);
    req.extensions_mut().insert(session);

    next.run(req).await
}

/// Rejects anonymous requests with 401
///
/// Must run inside [`session_middleware`].
pub async fn require_session_middleware(req: Request, next: Next) -> Result<Response, AuthError> {
    let signed_in = req
        .extensions()
        .get::<SessionContext>()
        .map(SessionContext::is_signed_in)
        .unwrap_or(false);

    if !signed_in {
        return Err(AuthError::MissingSession);
    }

    Ok(next.run(req).await)
}
