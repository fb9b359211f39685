pub mod auth;
pub mod comments;
pub mod notifications;
pub mod posts;
pub mod reports;
pub mod search;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Body of mutations that have nothing else to say.
#[derive(Debug, Serialize, Deserialize)]
pub struct Success {
    pub success: bool,
}

pub fn success() -> Json<Success> {
    Json(Success { success: true })
}

/// Absent and empty strings both count as missing.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The full application: every API router plus the ambient layers.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.posts.max_body_bytes;
    let cors = state.config.server.cors;

    let mut app = Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(notifications::router())
        .merge(reports::router())
        .merge(search::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    if cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
