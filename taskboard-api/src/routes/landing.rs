/// Landing and not-found pages
///
/// # Endpoints
///
/// - `GET /` - Task and comment counts, plus the visitor's session
/// - `GET /404` - Not-found page
///
/// Counts come from [`LandingStats`] and only change once the refresh
/// window has passed.
///
/// [`LandingStats`]: taskboard_shared::flows::LandingStats

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Serialize;
use serde_json::json;
use taskboard_shared::auth::middleware::SessionContext;
use taskboard_shared::auth::session::SessionUser;
use taskboard_shared::flows::{LandingCounts, RedirectTarget};

/// Landing page payload
#[derive(Debug, Serialize)]
pub struct LandingPage {
    #[serde(flatten)]
    pub counts: LandingCounts,

    /// Signed-in visitor, if any
    pub user: Option<SessionUser>,

    /// Sign-in providers offered on the page
    pub providers: Vec<&'static str>,
}

pub async fn landing(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Json<LandingPage>> {
    let counts = state.landing.counts().await?;

    Ok(Json(LandingPage {
        counts,
        user: session.0,
        providers: state.providers.names(),
    }))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": "This page could not be found",
        })),
    )
        .into_response()
}

/// Unknown paths go to the not-found page
pub async fn fallback(uri: Uri) -> Redirect {
    tracing::debug!(path = %uri.path(), "No route, redirecting");
    Redirect::temporary(RedirectTarget::NotFound.path())
}
