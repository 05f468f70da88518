//! Group routes — create, list, join by code, message history.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::group::GroupError;
use crate::services::{chat, group};
use crate::state::AppState;

fn group_error_response(e: &GroupError) -> Response {
    let status = match e {
        GroupError::NotFound(_) | GroupError::CodeNotFound => StatusCode::NOT_FOUND,
        GroupError::AlreadyMember => StatusCode::CONFLICT,
        GroupError::NotMember => StatusCode::FORBIDDEN,
        GroupError::Serialize(_) | GroupError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

#[derive(Deserialize)]
pub struct CreateBody {
    name: String,
}

/// `POST /api/groups` — create a group; the caller becomes its first member.
pub async fn create(State(state): State<AppState>, auth: AuthUser, Json(body): Json<CreateBody>) -> Response {
    let name = body.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "name required" }))).into_response();
    }

    match group::create_group(&state.pool, name, auth.user.id).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => group_error_response(&e),
    }
}

/// `GET /api/groups` — all groups with member counts.
pub async fn list(State(state): State<AppState>, _auth: AuthUser) -> Response {
    match group::list_groups(&state.pool).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => group_error_response(&e),
    }
}

/// `GET /api/groups/mine` — the caller's groups.
pub async fn list_mine(State(state): State<AppState>, auth: AuthUser) -> Response {
    match group::list_groups_for_user(&state.pool, auth.user.id).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => group_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct JoinBody {
    code: String,
}

/// `POST /api/groups/join` — join a group by its shared code.
pub async fn join(State(state): State<AppState>, auth: AuthUser, Json(body): Json<JoinBody>) -> Response {
    match group::join_by_code(&state.pool, &body.code, auth.user.id).await {
        Ok(row) => Json(row).into_response(),
        Err(e) => group_error_response(&e),
    }
}

/// `GET /api/groups/{id}/messages` — recent chat history, oldest first.
pub async fn messages(State(state): State<AppState>, auth: AuthUser, Path(group_id): Path<Uuid>) -> Response {
    match group::is_member(&state.pool, group_id, auth.user.id).await {
        Ok(true) => {}
        Ok(false) => return group_error_response(&GroupError::NotMember),
        Err(e) => return group_error_response(&e),
    }

    match chat::list_messages(&state.pool, group_id).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            tracing::error!(error = %e, %group_id, "message history load failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
#[path = "groups_test.rs"]
mod tests;
