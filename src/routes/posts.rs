use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PostsConfig;
use crate::db::models::{NewPost, Post, PostImage, PostUpdate, PublicUser};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::{non_empty, success, Success};
use crate::state::AppState;
use crate::storage::Storage;

const IMAGE_TYPES: [&str; 4] = [
    "data:image/jpeg",
    "data:image/jpg",
    "data:image/png",
    "data:image/gif",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list).post(create))
        .route("/api/posts/trending", get(trending))
        .route("/api/posts/{id}", get(show).patch(update).delete(remove))
        .route("/api/posts/{id}/upvote", post(upvote).delete(remove_upvote))
        .route("/api/posts/{id}/save", post(save).delete(remove_save))
}

// --- Views ---

/// A post as the feed renders it: the row plus author, the viewer's
/// engagement flags and the attached images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<PublicUser>,
    pub is_upvoted: bool,
    pub is_saved: bool,
    pub images: Vec<PostImage>,
}

/// Annotate posts for `viewer`. Anonymous viewers see both flags false.
pub fn annotate(
    storage: &Storage,
    posts: Vec<Post>,
    viewer: Option<&str>,
) -> AppResult<Vec<PostView>> {
    let mut authors: HashMap<String, Option<PublicUser>> = HashMap::new();
    let mut views = Vec::with_capacity(posts.len());

    for post in posts {
        let author = match authors.get(&post.author_id) {
            Some(author) => author.clone(),
            None => {
                let author = storage.get_user(&post.author_id)?.map(PublicUser::from);
                authors.insert(post.author_id.clone(), author.clone());
                author
            }
        };
        let (is_upvoted, is_saved) = match viewer {
            Some(viewer) => (
                storage.has_upvoted(&post.id, viewer)?,
                storage.has_saved(&post.id, viewer)?,
            ),
            None => (false, false),
        };
        let images = storage.post_images(&post.id)?;

        views.push(PostView {
            post,
            author,
            is_upvoted,
            is_saved,
            images,
        });
    }

    Ok(views)
}

fn annotate_one(storage: &Storage, post: Post, viewer: Option<&str>) -> AppResult<PostView> {
    annotate(storage, vec![post], viewer)?
        .pop()
        .ok_or_else(|| AppError::Internal("annotation dropped a post".into()))
}

// --- Requests ---

#[derive(Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub author_id: Option<String>,
    pub cover_image_url: Option<String>,
    /// Untyped so a non-string entry is reported as a 400.
    pub images: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedPost {
    #[serde(flatten)]
    pub post: Post,
    pub images: Vec<PostImage>,
}

/// Check attached images: count, data-URL type and encoded size.
pub fn validate_images(images: &[Value], config: &PostsConfig) -> AppResult<Vec<String>> {
    if images.len() > config.max_images {
        return Err(AppError::BadRequest(format!(
            "Maximum {} images allowed per post",
            config.max_images
        )));
    }

    images
        .iter()
        .map(|image| {
            let image = image
                .as_str()
                .ok_or_else(|| AppError::BadRequest("Invalid image format".into()))?;
            if !image.starts_with("data:image/") {
                return Err(AppError::BadRequest(
                    "Invalid image format. Only jpg, png, gif allowed".into(),
                ));
            }
            let known_type = IMAGE_TYPES.iter().any(|t| {
                image
                    .strip_prefix(t)
                    .is_some_and(|rest| rest.starts_with(|c| c == ';' || c == ','))
            });
            if !known_type {
                return Err(AppError::BadRequest(
                    "Invalid image type. Only jpg, png, gif allowed".into(),
                ));
            }
            if image.len() > config.max_image_bytes {
                // base64 carries 3 bytes in 4 characters
                let decoded_mb = config.max_image_bytes * 3 / 4 / (1024 * 1024);
                return Err(AppError::BadRequest(format!(
                    "Image too large. Maximum {}MB per image",
                    decoded_mb
                )));
            }
            Ok(image.to_string())
        })
        .collect()
}

// --- Handlers ---

async fn list(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<PostView>>> {
    let config = &state.config.posts;
    let limit = query
        .limit
        .unwrap_or(config.page_size)
        .min(config.max_page_size);
    let offset = query.offset.unwrap_or(0);

    let posts = match non_empty(query.category) {
        Some(category) => state
            .storage
            .list_posts_by_category(&category, limit, offset)?,
        None => state.storage.list_posts(limit, offset)?,
    };
    Ok(Json(annotate(&state.storage, posts, viewer.id())?))
}

async fn trending(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> AppResult<Json<Vec<PostView>>> {
    let posts = state
        .storage
        .trending_posts(state.config.posts.trending_window)?;
    Ok(Json(annotate(&state.storage, posts, viewer.id())?))
}

async fn show(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<PostView>> {
    let post = state
        .storage
        .get_post(&id)?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(annotate_one(&state.storage, post, viewer.id())?))
}

async fn create(
    State(state): State<AppState>,
    caller: MaybeUser,
    Json(body): Json<CreatePostRequest>,
) -> AppResult<Json<CreatedPost>> {
    let (Some(title), Some(content), Some(category), Some(author_id)) = (
        non_empty(body.title),
        non_empty(body.content),
        non_empty(body.category),
        non_empty(body.author_id),
    ) else {
        return Err(AppError::BadRequest(
            "Title, content, category, and authorId are required".into(),
        ));
    };
    caller.ensure_is(&author_id)?;

    let images = validate_images(body.images.as_deref().unwrap_or_default(), &state.config.posts)?;

    let (post, images) = state.storage.create_post(
        NewPost {
            title,
            content,
            category,
            tags: non_empty(body.tags),
            cover_image_url: non_empty(body.cover_image_url),
            author_id,
        },
        &images,
    )?;

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post created");
    Ok(Json(CreatedPost { post, images }))
}

async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<PostUpdate>,
) -> AppResult<Json<PostView>> {
    let post = state
        .storage
        .get_post(&id)?
        .ok_or(AppError::NotFound("Post"))?;
    caller.ensure_is(&post.author_id)?;

    let post = state
        .storage
        .update_post(&id, body)?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(annotate_one(&state.storage, post, Some(caller.id.as_str()))?))
}

async fn remove(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    let post = state
        .storage
        .get_post(&id)?
        .ok_or(AppError::NotFound("Post"))?;
    if post.author_id != caller.id && !caller.is_admin {
        return Err(AppError::Forbidden);
    }

    state.storage.delete_post(&id)?;
    tracing::info!(post_id = %id, by = %caller.id, "Post deleted");
    Ok(success())
}

async fn upvote(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    match state.storage.create_upvote(&id, &caller.id)? {
        Some(_) => Ok(success()),
        None => Err(AppError::BadRequest("Already upvoted".into())),
    }
}

async fn remove_upvote(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    state.storage.delete_upvote(&id, &caller.id)?;
    Ok(success())
}

async fn save(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    match state.storage.create_save(&id, &caller.id)? {
        Some(_) => Ok(success()),
        None => Err(AppError::BadRequest("Already saved".into())),
    }
}

async fn remove_save(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Success>> {
    state.storage.delete_save(&id, &caller.id)?;
    Ok(success())
}
