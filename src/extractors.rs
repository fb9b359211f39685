use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::auth::session;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Represents the calling user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub is_admin: bool,
    /// Session token, when identified by bearer auth.
    pub token: Option<String>,
}

impl CurrentUser {
    fn new(user: User, token: Option<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            is_admin: user.is_admin,
            token,
        }
    }

    /// A body-supplied actor id must name the caller.
    pub fn ensure_is(&self, actor_id: &str) -> AppResult<()> {
        if self.id == actor_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Extractor that requires an identified caller.
/// Returns 401 when neither a live session nor a trusted user id header names a known user.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        identify(&parts.headers, state)?.ok_or(AppError::Unauthorized)
    }
}

/// Optional user extractor; `None` instead of 401 when not identified.
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.id.as_str())
    }

    /// Like [`CurrentUser::ensure_is`], but anonymous callers pass.
    pub fn ensure_is(&self, actor_id: &str) -> AppResult<()> {
        match &self.0 {
            Some(user) => user.ensure_is(actor_id),
            None => Ok(()),
        }
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(identify(&parts.headers, state)?))
    }
}

fn identify(headers: &HeaderMap, state: &AppState) -> AppResult<Option<CurrentUser>> {
    // A bearer token wins over the header, even when it turns out to be stale.
    if let Some(token) = bearer_token(headers) {
        let user = session::user_for_token(&state.db, token)?;
        return Ok(user.map(|u| CurrentUser::new(u, Some(token.to_string()))));
    }

    if !state.config.auth.trust_user_id_header {
        return Ok(None);
    }

    match user_id_header(headers) {
        Some(id) => Ok(state
            .storage
            .get_user(id)?
            .map(|u| CurrentUser::new(u, None))),
        None => Ok(None),
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn user_id_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}
