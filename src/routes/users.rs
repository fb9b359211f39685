use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::{PublicUser, UserUpdate};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::posts::{annotate, PostView};
use crate::routes::{success, Success};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/{id}", get(show).patch(update))
        .route("/api/users/{id}/posts", get(posts))
        .route("/api/users/{id}/saved", get(saved))
        .route("/api/users/{id}/followers", get(followers))
        .route("/api/users/{id}/following", get(following))
        .route("/api/users/{id}/follow", post(follow).delete(unfollow))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub is_following: bool,
}

async fn show(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .storage
        .get_user(&id)?
        .ok_or(AppError::NotFound("User"))?;

    let is_following = match viewer.id() {
        Some(viewer) if viewer != id => state.storage.is_following(viewer, &id)?,
        _ => false,
    };

    Ok(Json(UserProfile {
        user: user.into(),
        is_following,
    }))
}

async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> AppResult<Json<PublicUser>> {
    caller.ensure_is(&id)?;
    let user = state
        .storage
        .update_user(&id, body)?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user.into()))
}

async fn posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PostView>>> {
    let posts = state.storage.posts_by_author(&id)?;
    Ok(Json(annotate(&state.storage, posts, viewer.id())?))
}

/// Flags are computed for the profile owner, so every entry is saved.
async fn saved(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PostView>>> {
    let posts = state.storage.saved_posts(&id)?;
    Ok(Json(annotate(&state.storage, posts, Some(id.as_str()))?))
}

async fn followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PublicUser>>> {
    let users = state.storage.followers(&id)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

async fn following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PublicUser>>> {
    let users = state.storage.following(&id)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

async fn follow(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    match state.storage.create_follow(&caller.id, &id)? {
        Some(_) => Ok(success()),
        None => Err(AppError::BadRequest("Already following".into())),
    }
}

async fn unfollow(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    state.storage.delete_follow(&caller.id, &id)?;
    Ok(success())
}
