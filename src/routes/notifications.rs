use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::models::{Notification, PublicUser};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::{success, Success};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/mark-all-read", post(mark_all_read))
        .route("/api/notifications/{id}/read", post(mark_read))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub from_user: Option<PublicUser>,
}

async fn list(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> AppResult<Json<Vec<NotificationView>>> {
    let views = state
        .storage
        .notifications_for(&caller.id)?
        .into_iter()
        .map(|notification| -> AppResult<NotificationView> {
            let from_user = match &notification.from_user_id {
                Some(id) => state.storage.get_user(id)?.map(PublicUser::from),
                None => None,
            };
            Ok(NotificationView {
                notification,
                from_user,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(views))
}

async fn unread_count(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> AppResult<Json<Value>> {
    let count = state.storage.unread_notification_count(&caller.id)?;
    Ok(Json(json!({ "count": count })))
}

async fn mark_read(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    if !state.storage.mark_notification_read(&id, &caller.id)? {
        return Err(AppError::NotFound("Notification"));
    }
    Ok(success())
}

async fn mark_all_read(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> AppResult<Json<Success>> {
    let marked = state.storage.mark_all_notifications_read(&caller.id)?;
    tracing::debug!(user_id = %caller.id, marked, "Marked notifications read");
    Ok(success())
}
