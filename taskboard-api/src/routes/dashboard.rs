/// Dashboard endpoints
///
/// Everything here is scoped to the signed-in user's email.
///
/// # Endpoints
///
/// - `GET /dashboard` - User and task listing (redirects to `/` when signed out)
/// - `GET /dashboard/tasks/stream` - Live listing as SSE `snapshot` events
/// - `POST /dashboard/tasks` - Create a task from the form
/// - `DELETE /dashboard/tasks/:id` - Delete a task
/// - `POST /dashboard/tasks/:id/share` - Share link for a task

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{mutation_response, snapshot_event, SSE_KEEPALIVE},
};
use axum::{
    extract::{Path, State},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Redirect, Response,
    },
    Extension, Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{middleware::SessionContext, session::SessionUser},
    flows::{AccessGuard, PageDecision, ShareLink, TaskDraft},
    models::Task,
    store::DocumentId,
};

/// Dashboard payload
#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub user: SessionUser,

    /// Newest first
    pub tasks: Vec<Task>,
}

/// Delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// `false` when nothing had that id
    pub deleted: bool,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Response> {
    let user = match AccessGuard::require_session(session.user()) {
        PageDecision::Render(user) => user,
        PageDecision::Redirect(target) => return Ok(Redirect::temporary(target.path()).into_response()),
    };

    let tasks = state.tasks.tasks_for_owner(&user.email).await?;

    Ok(Json(DashboardPage { user, tasks }).into_response())
}

/// Streams the owner's listing until the client disconnects
pub async fn stream_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Response> {
    let user = match AccessGuard::require_session(session.user()) {
        PageDecision::Render(user) => user,
        PageDecision::Redirect(target) => return Ok(Redirect::temporary(target.path()).into_response()),
    };

    let live = state.tasks.list_for_owner(&user.email).await?;
    tracing::debug!(owner = %user.email, "Dashboard stream opened");

    Ok(Sse::new(live.map(snapshot_event))
        .keep_alive(KeepAlive::new().interval(SSE_KEEPALIVE))
        .into_response())
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(mut draft): Json<TaskDraft>,
) -> ApiResult<Response> {
    let outcome = state.tasks.create(&mut draft, session.user()).await?;

    Ok(mutation_response(outcome, "task", &draft))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.tasks.delete(&DocumentId::new(id), session.user()).await?;

    Ok(Json(DeleteResponse { deleted }))
}

pub async fn share_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ShareLink> {
    Json(state.tasks.share(&DocumentId::new(id)))
}
