/// Public task page endpoints
///
/// # Endpoints
///
/// - `GET /task/:id` - Task and its comments (redirects when missing or private)
/// - `GET /task/:id/comments/stream` - Live comments as SSE `snapshot` events
/// - `POST /task/:id/comments` - Add a comment
/// - `DELETE /task/:id/comments/:comment_id` - Delete a comment
///
/// Reading needs no session; adding a comment while signed out is ignored.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{dashboard::DeleteResponse, mutation_response, snapshot_event, SSE_KEEPALIVE},
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
use serde::Serialize;
use taskboard_shared::{
    auth::{middleware::SessionContext, session::SessionUser},
    flows::{CommentDraft, PageDecision},
    models::{Comment, PublicTaskView},
    store::DocumentId,
};

/// Public task page payload
#[derive(Debug, Serialize)]
pub struct TaskPage {
    pub task: PublicTaskView,

    /// Newest first
    pub comments: Vec<Comment>,

    /// Signed-in visitor, if any
    pub viewer: Option<SessionUser>,
}

pub async fn task_page(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = DocumentId::new(id);
    let task = match state.guard.public_task(&id).await? {
        PageDecision::Render(task) => task,
        PageDecision::Redirect(target) => return Ok(Redirect::temporary(target.path()).into_response()),
    };

    let comments = state.public_tasks.comments_for_task(&id).await?;

    Ok(Json(TaskPage {
        task: task.public_view(),
        comments,
        viewer: session.0,
    })
    .into_response())
}

/// Streams the task's comments until the client disconnects
pub async fn stream_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = DocumentId::new(id);
    if let PageDecision::Redirect(target) = state.guard.public_task(&id).await? {
        return Ok(Redirect::temporary(target.path()).into_response());
    }

    let live = state.public_tasks.list_comments(&id).await?;
    tracing::debug!(task_id = %id, "Comment stream opened");

    Ok(Sse::new(live.map(snapshot_event))
        .keep_alive(KeepAlive::new().interval(SSE_KEEPALIVE))
        .into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(mut draft): Json<CommentDraft>,
) -> ApiResult<Response> {
    let outcome = state
        .public_tasks
        .add_comment(&DocumentId::new(id), &mut draft, session.user())
        .await?;

    Ok(mutation_response(outcome, "comment", &draft))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path((_task_id, comment_id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state
        .public_tasks
        .delete_comment(&DocumentId::new(comment_id), session.user())
        .await?;

    Ok(Json(DeleteResponse { deleted }))
}
