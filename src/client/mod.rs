//! Client-side data and auth layer for the Nexio API.
//!
//! [`ApiClient`] wraps the HTTP routes, keeps the signed-in user in a
//! [`SessionStore`] and serves reads through a [`QueryCache`] that mutations
//! invalidate by key prefix.

pub mod cache;
pub mod display;
pub mod navigation;
pub mod session;
pub mod store;

use std::sync::Arc;

use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use url::Url;

use crate::auth::handlers::AuthResponse;
use crate::db::models::{PublicUser, Report, UserUpdate};
use crate::extractors::USER_ID_HEADER;
use crate::routes::comments::CommentView;
use crate::routes::notifications::NotificationView;
use crate::routes::posts::{CreatedPost, PostView};
use crate::routes::search::SearchResults;
use crate::routes::users::UserProfile;

pub use self::cache::{QueryCache, QueryKey};
pub use self::session::{SessionStore, StoredAuth};
pub use self::store::{FileStore, KeyValueStore, MemoryStore};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{status}: {message}")]
    Status { status: u16, message: String },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// What a new post needs from the author; the client fills in `authorId`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// Image data URLs, in display order.
    pub images: Vec<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionStore,
    cache: Mutex<QueryCache>,
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        Self::with_cache(base_url, store, QueryCache::default())
    }

    pub fn with_cache(
        base_url: &str,
        store: Arc<dyn KeyValueStore>,
        cache: QueryCache,
    ) -> ClientResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base_url)?,
            session: SessionStore::new(store),
            cache: Mutex::new(cache),
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub async fn current_user(&self) -> ClientResult<Option<PublicUser>> {
        Ok(self.session.load().await?.map(|auth| auth.user))
    }

    async fn require_user(&self) -> ClientResult<PublicUser> {
        self.current_user().await?.ok_or(ClientError::NotSignedIn)
    }

    // --- Transport ---

    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Value>,
    ) -> ClientResult<Value> {
        let mut url = self.base.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        let mut request = self.http.request(method.clone(), url);
        if let Some(auth) = self.session.load().await? {
            request = request.header(USER_ID_HEADER, auth.user.id);
            if let Some(token) = auth.token {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(status, &response.text().await.unwrap_or_default());
            tracing::debug!(%method, path, status = status.as_u16(), %message, "Request failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            Ok(response.json().await?)
        } else {
            Ok(Value::Null)
        }
    }

    /// Serve from cache while fresh, otherwise fetch and remember.
    async fn query<T: DeserializeOwned>(&self, key: QueryKey) -> ClientResult<T> {
        if let Some(value) = self.cache.lock().await.get_fresh(&key).cloned() {
            return Ok(serde_json::from_value(value)?);
        }

        let value = self
            .request(Method::GET, &key.path(), key.params(), None)
            .await?;
        let parsed = serde_json::from_value(value.clone())?;
        self.cache.lock().await.insert(key, value);
        Ok(parsed)
    }

    /// Send a mutation, then drop every cached query under each prefix.
    async fn mutate<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        invalidate: &[&[&str]],
    ) -> ClientResult<T> {
        let value = self.request(method, path, &[], body).await?;
        let mut cache = self.cache.lock().await;
        for prefix in invalidate {
            cache.invalidate(prefix);
        }
        drop(cache);
        Ok(serde_json::from_value(value)?)
    }

    // --- Auth ---

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> ClientResult<PublicUser> {
        let body = json!({ "name": name, "email": email, "password": password });
        let auth: AuthResponse = self
            .mutate(Method::POST, "/api/auth/signup", Some(body), &[])
            .await?;
        self.remember(auth).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<PublicUser> {
        let body = json!({ "email": email, "password": password });
        let auth: AuthResponse = self
            .mutate(Method::POST, "/api/auth/login", Some(body), &[])
            .await?;
        self.remember(auth).await
    }

    async fn remember(&self, auth: AuthResponse) -> ClientResult<PublicUser> {
        self.cache.lock().await.clear();
        self.session
            .save(&StoredAuth {
                user: auth.user.clone(),
                token: Some(auth.token),
            })
            .await?;
        Ok(auth.user)
    }

    /// Local state is cleared even when the server call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        if let Err(e) = self
            .request(Method::POST, "/api/auth/logout", &[], None)
            .await
        {
            tracing::warn!("Server logout failed: {}", e);
        }
        self.cache.lock().await.clear();
        self.session.clear().await
    }

    pub async fn update_profile(&self, update: UserUpdate) -> ClientResult<PublicUser> {
        let me = self.require_user().await?;
        let path = format!("/api/users/{}", me.id);
        let user: PublicUser = self
            .mutate(
                Method::PATCH,
                &path,
                Some(serde_json::to_value(&update)?),
                &[&["/api/users", me.id.as_str()]],
            )
            .await?;
        self.session.update_user(user.clone()).await?;
        Ok(user)
    }

    /// Re-read the signed-in user's record from the server.
    pub async fn refresh_user(&self) -> ClientResult<Option<PublicUser>> {
        let Some(me) = self.current_user().await? else {
            return Ok(None);
        };
        let path = format!("/api/users/{}", me.id);
        let profile: UserProfile = serde_json::from_value(
            self.request(Method::GET, &path, &[], None).await?,
        )?;
        self.session.update_user(profile.user.clone()).await?;
        Ok(Some(profile.user))
    }

    // --- Queries ---

    pub async fn feed(&self, category: Option<&str>) -> ClientResult<Vec<PostView>> {
        let mut key = QueryKey::new(["/api/posts"]);
        if let Some(category) = category {
            key = key.with_param("category", category);
        }
        self.query(key).await
    }

    pub async fn trending(&self) -> ClientResult<Vec<PostView>> {
        self.query(QueryKey::new(["/api/posts", "trending"])).await
    }

    pub async fn post(&self, id: &str) -> ClientResult<PostView> {
        self.query(QueryKey::new(["/api/posts", id])).await
    }

    pub async fn comments(&self, post_id: &str) -> ClientResult<Vec<CommentView>> {
        self.query(QueryKey::new(["/api/posts", post_id, "comments"]))
            .await
    }

    pub async fn user(&self, id: &str) -> ClientResult<UserProfile> {
        self.query(QueryKey::new(["/api/users", id])).await
    }

    pub async fn user_posts(&self, id: &str) -> ClientResult<Vec<PostView>> {
        self.query(QueryKey::new(["/api/users", id, "posts"])).await
    }

    pub async fn saved_posts(&self, id: &str) -> ClientResult<Vec<PostView>> {
        self.query(QueryKey::new(["/api/users", id, "saved"])).await
    }

    pub async fn notifications(&self) -> ClientResult<Vec<NotificationView>> {
        self.query(QueryKey::new(["/api/notifications"])).await
    }

    pub async fn search(&self, q: &str) -> ClientResult<SearchResults> {
        self.query(QueryKey::new(["/api/search"]).with_param("q", q))
            .await
    }

    // --- Mutations ---

    pub async fn create_post(&self, draft: PostDraft) -> ClientResult<CreatedPost> {
        let me = self.require_user().await?;
        let mut body = serde_json::to_value(&draft)?;
        body["authorId"] = Value::String(me.id);
        self.mutate(Method::POST, "/api/posts", Some(body), &[&["/api/posts"]])
            .await
    }

    pub async fn upvote(&self, post_id: &str) -> ClientResult<()> {
        self.engagement(Method::POST, post_id, "upvote").await
    }

    pub async fn remove_upvote(&self, post_id: &str) -> ClientResult<()> {
        self.engagement(Method::DELETE, post_id, "upvote").await
    }

    pub async fn save(&self, post_id: &str) -> ClientResult<()> {
        self.engagement(Method::POST, post_id, "save").await
    }

    pub async fn unsave(&self, post_id: &str) -> ClientResult<()> {
        self.engagement(Method::DELETE, post_id, "save").await
    }

    async fn engagement(&self, method: Method, post_id: &str, action: &str) -> ClientResult<()> {
        let path = format!("/api/posts/{}/{}", post_id, action);
        let _: Value = self
            .mutate(method, &path, None, &[&["/api/posts"]])
            .await?;
        Ok(())
    }

    pub async fn comment(&self, post_id: &str, content: &str) -> ClientResult<CommentView> {
        let me = self.require_user().await?;
        let path = format!("/api/posts/{}/comments", post_id);
        self.mutate(
            Method::POST,
            &path,
            Some(json!({ "content": content, "authorId": me.id })),
            &[&["/api/posts", post_id]],
        )
        .await
    }

    pub async fn delete_comment(&self, comment_id: &str, post_id: &str) -> ClientResult<()> {
        let path = format!("/api/comments/{}", comment_id);
        let _: Value = self
            .mutate(Method::DELETE, &path, None, &[&["/api/posts", post_id]])
            .await?;
        Ok(())
    }

    pub async fn follow(&self, user_id: &str) -> ClientResult<()> {
        self.follow_edge(Method::POST, user_id).await
    }

    pub async fn unfollow(&self, user_id: &str) -> ClientResult<()> {
        self.follow_edge(Method::DELETE, user_id).await
    }

    async fn follow_edge(&self, method: Method, user_id: &str) -> ClientResult<()> {
        let path = format!("/api/users/{}/follow", user_id);
        let _: Value = self
            .mutate(method, &path, None, &[&["/api/users", user_id]])
            .await?;
        Ok(())
    }

    pub async fn mark_read(&self, notification_id: &str) -> ClientResult<()> {
        let path = format!("/api/notifications/{}/read", notification_id);
        let _: Value = self
            .mutate(Method::POST, &path, None, &[&["/api/notifications"]])
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> ClientResult<()> {
        let _: Value = self
            .mutate(
                Method::POST,
                "/api/notifications/mark-all-read",
                None,
                &[&["/api/notifications"]],
            )
            .await?;
        Ok(())
    }

    pub async fn report(&self, post_id: &str, reason: &str) -> ClientResult<Report> {
        let me = self.require_user().await?;
        self.mutate(
            Method::POST,
            "/api/reports",
            Some(json!({ "postId": post_id, "reporterId": me.id, "reason": reason })),
            &[],
        )
        .await
    }
}

/// Prefer the server's `{"message"}`, then the raw body, then the reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    if !body.trim().is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_sources() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":"Already upvoted"}"#),
            "Already upvoted"
        );
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, "missing field"),
            "missing field"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn draft_serializes_camel_case() {
        let draft = PostDraft {
            title: "T".into(),
            content: "C".into(),
            category: "Science".into(),
            cover_image_url: Some("data:image/png;base64,AA".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["coverImageUrl"], "data:image/png;base64,AA");
        assert!(value.get("tags").is_none());
        assert_eq!(value["images"], json!([]));
    }

    #[tokio::test]
    async fn mutations_need_a_signed_in_user() {
        let client = ApiClient::new("http://127.0.0.1:9", Arc::new(MemoryStore::new())).unwrap();
        let err = client.comment("p1", "hi").await.unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
        assert_eq!(client.current_user().await.unwrap(), None);
    }
}
