//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST API and the websocket endpoint under a single
//! Axum router. The browser client talks REST for auth, groups, and profile
//! stats, then upgrades to the websocket for live chat and whiteboard sync.

pub mod auth;
pub mod groups;
pub mod profile;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// REST + websocket routes.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/ws-ticket", post(auth::ws_ticket))
        .route("/api/groups", get(groups::list).post(groups::create))
        .route("/api/groups/join", post(groups::join))
        .route("/api/groups/mine", get(groups::list_mine))
        .route("/api/groups/{id}/messages", get(groups::messages))
        .route("/api/profile", get(profile::stats))
        .route("/api/profile/heartbeat", post(profile::heartbeat))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application router with request tracing.
pub fn app(state: AppState) -> Router {
    api_routes(state).layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
