/// Identity endpoints
///
/// Sign-in is an OAuth authorization-code round trip. The `state` value is
/// generated per attempt, mirrored in a short-lived cookie and compared on
/// the callback. A successful callback sets the session cookie and lands the
/// user on the dashboard.
///
/// # Endpoints
///
/// - `GET /api/auth/signin/:provider` - Redirect to the provider
/// - `GET /api/auth/callback/:provider` - Finish sign-in
/// - `POST /api/auth/signout` - Clear the session
/// - `GET /api/auth/session` - Current session

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::auth::{
    cookie::{
        clear_cookie, cookie_value, generate_oauth_state, set_cookie, OAUTH_STATE_COOKIE,
        OAUTH_STATE_MAX_AGE, SESSION_COOKIE,
    },
    middleware::SessionContext,
    session::{issue_session_token, SessionClaims, SessionUser},
};

/// Where a signed-in user lands
const AFTER_SIGNIN: &str = "/dashboard";

/// Query string of the provider callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Session response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Signed-in user, `null` when anonymous
    pub user: Option<SessionUser>,
}

fn callback_url(state: &AppState, provider: &str) -> String {
    format!("{}/api/auth/callback/{}", state.config.api.public_url, provider)
}

/// Redirects to the provider's consent page
pub async fn signin(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Response> {
    let identity = state.providers.get(&provider)?;
    let oauth_state = generate_oauth_state();
    let url = identity.authorization_url(&oauth_state, &callback_url(&state, &provider))?;

    tracing::debug!(provider = %provider, "Starting sign-in");

    let cookie = set_cookie(
        OAUTH_STATE_COOKIE,
        &oauth_state,
        OAUTH_STATE_MAX_AGE,
        state.config.api.production,
    );

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::temporary(&url)).into_response())
}

/// Completes sign-in and sets the session cookie
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let identity = state.providers.get(&provider)?;

    if let Some(error) = params.error {
        tracing::info!(provider = %provider, error = %error, "Sign-in declined");
        return Err(ApiError::Unauthorized(format!("Sign-in declined: {}", error)));
    }

    let expected = cookie_value(&headers, OAUTH_STATE_COOKIE);
    match (expected, params.state.as_deref()) {
        (Some(expected), Some(returned)) if expected == returned => {}
        _ => {
            tracing::warn!(provider = %provider, "OAuth state mismatch");
            return Err(ApiError::BadRequest("OAuth state mismatch".to_string()));
        }
    }

    let code = params
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let user = identity
        .exchange_code(&code, &callback_url(&state, &provider))
        .await?;
    let token = issue_session_token(&user, &state.config.jwt.secret)?;
    let max_age = SessionClaims::new(&user).max_age_seconds();

    tracing::info!(provider = %provider, email = %user.email, "User signed in");

    let secure = state.config.api.production;
    Ok((
        AppendHeaders([
            (SET_COOKIE, set_cookie(SESSION_COOKIE, &token, max_age, secure)),
            (SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE, secure)),
        ]),
        Redirect::temporary(AFTER_SIGNIN),
    )
        .into_response())
}

/// Clears the session cookie and returns to the landing page
pub async fn signout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    if let Some(email) = session.email() {
        tracing::info!(email = %email, "User signed out");
    }

    (
        AppendHeaders([(
            SET_COOKIE,
            clear_cookie(SESSION_COOKIE, state.config.api.production),
        )]),
        Redirect::to("/"),
    )
        .into_response()
}

pub async fn session(Extension(session): Extension<SessionContext>) -> Json<SessionResponse> {
    Json(SessionResponse { user: session.0 })
}
