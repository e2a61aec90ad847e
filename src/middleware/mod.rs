use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::Role;
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token_cookie";

/// The authenticated staff member behind a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("You do not have permission to perform this action".to_string()))
        }
    }
}

pub const ANY_STAFF: &[Role] = &[Role::Admin, Role::Manager, Role::BookingStaff];
pub const ADMIN_OR_MANAGER: &[Role] = &[Role::Admin, Role::Manager];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == ACCESS_TOKEN_COOKIE).then_some(value)
        })
}

// Bearer header first, then the cookie set at login
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let claims = state.auth.validate_token(token)?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id,
            username: claims.username,
            role: claims.role,
        })
    }
}
