use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::PublicUser;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::posts::{annotate, PostView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/search", get(search))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SearchResults {
    pub posts: Vec<PostView>,
    pub users: Vec<PublicUser>,
}

async fn search(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<SearchResults>> {
    let config = &state.config.search;
    let Some(q) = query.q.filter(|q| q.chars().count() >= config.min_query_len) else {
        return Ok(Json(SearchResults::default()));
    };

    let posts = state.storage.search_posts(&q)?;
    let users = state.storage.search_users(&q, config.user_limit)?;

    Ok(Json(SearchResults {
        posts: annotate(&state.storage, posts, viewer.id())?,
        users: users.into_iter().map(PublicUser::from).collect(),
    }))
}
