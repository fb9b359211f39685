use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, NewComment, PublicUser};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::{non_empty, success, Success};
use crate::state::AppState;
use crate::storage::Storage;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts/{id}/comments", get(list).post(create))
        .route("/api/comments/{id}", delete(remove))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<PublicUser>,
}

impl CommentView {
    fn load(storage: &Storage, comment: Comment) -> AppResult<Self> {
        let author = storage.get_user(&comment.author_id)?.map(PublicUser::from);
        Ok(Self { comment, author })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub author_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Vec<CommentView>>> {
    let comments = state
        .storage
        .comments_for_post(&post_id)?
        .into_iter()
        .map(|c| CommentView::load(&state.storage, c))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(comments))
}

async fn create(
    State(state): State<AppState>,
    caller: MaybeUser,
    Path(post_id): Path<String>,
    Json(body): Json<CreateCommentRequest>,
) -> AppResult<Json<CommentView>> {
    let (Some(content), Some(author_id)) = (non_empty(body.content), non_empty(body.author_id))
    else {
        return Err(AppError::BadRequest(
            "Content and authorId are required".into(),
        ));
    };
    caller.ensure_is(&author_id)?;

    let comment = state.storage.create_comment(NewComment {
        content,
        post_id,
        author_id,
    })?;
    Ok(Json(CommentView::load(&state.storage, comment)?))
}

async fn remove(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    let comment = state
        .storage
        .get_comment(&id)?
        .ok_or(AppError::NotFound("Comment"))?;
    caller.ensure_is(&comment.author_id)?;

    state.storage.delete_comment(&id)?;
    Ok(success())
}
