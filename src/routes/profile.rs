//! Profile routes — stats with streak touch, study-time heartbeats.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::services::profile::{self, ProfileError};
use crate::state::AppState;

fn profile_error_response(e: &ProfileError) -> Response {
    let status = match e {
        ProfileError::UserNotFound(_) => StatusCode::NOT_FOUND,
        ProfileError::InvalidDuration => StatusCode::BAD_REQUEST,
        ProfileError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

/// `GET /api/profile` — load stats. Viewing the profile counts as a visit,
/// so the streak rule is applied first.
pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(e) = profile::touch_streak(&state.pool, auth.user.id).await {
        return profile_error_response(&e);
    }

    match profile::load_stats(&state.pool, auth.user.id).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => profile_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct HeartbeatBody {
    seconds: i64,
}

/// `POST /api/profile/heartbeat` — accumulate study time.
pub async fn heartbeat(State(state): State<AppState>, auth: AuthUser, Json(body): Json<HeartbeatBody>) -> Response {
    match profile::record_time(&state.pool, auth.user.id, body.seconds).await {
        Ok(total) => Json(serde_json::json!({ "time_spent_secs": total })).into_response(),
        Err(e) => profile_error_response(&e),
    }
}
