use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{password, session};
use crate::db::models::{NewUser, PublicUser};
use crate::error::{AppError, AppResult};
use crate::extractors::{bearer_token, CurrentUser};
use crate::routes::{non_empty, success, Success};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(name), Some(email), Some(password)) = (
        non_empty(body.name),
        non_empty(body.email),
        non_empty(body.password),
    ) else {
        return Err(AppError::BadRequest(
            "Name, email, and password are required".into(),
        ));
    };

    if state.storage.get_user_by_email(&email)?.is_some() {
        return Err(AppError::BadRequest("Email already in use".into()));
    }

    let password_hash = password::hash(password, state.config.auth.bcrypt_cost).await?;
    let user = state.storage.create_user(NewUser {
        email,
        password_hash,
        name,
    })?;
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    tracing::info!(user_id = %user.id, "User signed up");
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (non_empty(body.email), non_empty(body.password)) else {
        return Err(AppError::BadRequest(
            "Email and password are required".into(),
        ));
    };

    let user = state
        .storage
        .get_user_by_email(&email)?
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify(password, user.password_hash.clone()).await? {
        return Err(AppError::InvalidCredentials);
    }

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Success>> {
    if let Some(token) = bearer_token(&headers) {
        session::delete_session(&state.db, token)?;
    }
    Ok(success())
}

pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<PublicUser>> {
    let user = state
        .storage
        .get_user(&user.id)?
        .ok_or(AppError::NotFound("User"))?;
    Ok(Json(user.into()))
}
