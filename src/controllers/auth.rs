use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use super::JsonBody;
use crate::error::AppError;
use crate::middleware::{AuthUser, ACCESS_TOKEN_COOKIE, ADMIN_ONLY};
use crate::models::{Role, User};
use crate::services::auth::check_password_strength;
use crate::store::UserStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/users", post(create_user))
}

fn token_cookie(state: &AppState, token: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        ACCESS_TOKEN_COOKIE, token, max_age
    );
    if state.config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

// POST /api/login
#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    username: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
    user: User,
}

async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());
    let user = state
        .store
        .find_user_by_username(req.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !state.auth.verify_password(&req.password, &user.password_hash).await? {
        warn!(username = %user.username, "failed login");
        return Err(invalid());
    }

    let token = state.auth.issue_token(&user)?;
    let cookie = token_cookie(&state, &token, state.auth.ttl_seconds());
    info!(username = %user.username, role = %user.role, "user logged in");

    let body = LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in: state.auth.ttl_seconds(),
        user,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

// POST /api/logout
async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, token_cookie(&state, "", 0))],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
}

// GET /api/me
#[derive(Debug, Serialize)]
struct MeResponse {
    user_id: i64,
    username: String,
    role: Role,
}

async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        username: user.username,
        role: user.role,
    })
}

// POST /api/users
#[derive(Debug, Deserialize, Validate)]
struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    username: String,
    password: String,
    role: Role,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_ONLY)?;
    req.validate()?;
    check_password_strength(&req.password)?;

    let hash = state.auth.hash_password(&req.password).await?;
    let created = state.store.create_user(req.username.trim(), &hash, req.role).await?;
    info!(created_by = %user.username, username = %created.username, role = %created.role, "user created");

    Ok((StatusCode::CREATED, Json(created)))
}
