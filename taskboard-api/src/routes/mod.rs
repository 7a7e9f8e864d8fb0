/// API route handlers
///
/// This module contains all route handlers organized by page:
///
/// - `health`: Health check endpoint
/// - `auth`: Sign-in, callback, sign-out and session endpoints
/// - `landing`: Landing counts and the not-found page
/// - `dashboard`: The signed-in user's tasks
/// - `task`: Public task page and its comments

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod landing;
pub mod task;

use axum::{
    http::StatusCode,
    response::{sse::Event, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use taskboard_shared::flows::{LiveSnapshot, Outcome};
use taskboard_shared::store::StoreResult;

/// Interval of SSE keep-alive comments
pub(crate) const SSE_KEEPALIVE: Duration = Duration::from_secs(25);

/// Answers a create-style mutation
///
/// An applied outcome is `201` with the stored item under `key`; an ignored
/// one is `200 {"status":"ignored","reason":…}`. Both echo the form state so
/// the client can keep or clear its inputs.
pub(crate) fn mutation_response<T, D>(outcome: Outcome<T>, key: &str, draft: &D) -> Response
where
    T: Serialize,
    D: Serialize,
{
    match outcome {
        Outcome::Applied(item) => {
            let mut body = json!({ "status": "created", "draft": draft });
            body[key] = json!(item);
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Outcome::Ignored(reason) => {
            tracing::debug!(reason = %reason, "Mutation ignored");
            (
                StatusCode::OK,
                Json(json!({ "status": "ignored", "reason": reason, "draft": draft })),
            )
                .into_response()
        }
    }
}

/// Turns a live listing update into an SSE event
///
/// Listings go out as `snapshot` events; a failed refresh becomes an
/// `error` event and the stream keeps going.
pub(crate) fn snapshot_event<T: Serialize>(update: StoreResult<LiveSnapshot<T>>) -> Result<Event, Infallible> {
    let event = match update {
        Ok(snapshot) => Event::default()
            .event("snapshot")
            .id(snapshot.version.to_string())
            .json_data(json!({ "version": snapshot.version, "items": snapshot.items })),
        Err(e) => {
            tracing::warn!(error = %e, "Live listing refresh failed");
            Ok(Event::default().event("error").data(e.to_string()))
        }
    };

    Ok(event.unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
}
