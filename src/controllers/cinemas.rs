use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::JsonBody;
use crate::error::AppError;
use crate::middleware::{AuthUser, ADMIN_OR_MANAGER};
use crate::models::{CinemaSummary, Screen};
use crate::services::catalog::screen_layout;
use crate::store::{CatalogStore, NewCinema};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinemas", get(list_cinemas).post(create_cinema))
        .route("/cinemas/{id}", delete(delete_cinema))
        .route("/cinemas/{id}/screens", get(list_screens).post(add_screen))
        .route("/screens/{id}", put(resize_screen).delete(remove_screen))
}

#[derive(Debug, Deserialize, Serialize)]
struct ScreenRequest {
    total_seats: i32,
    #[serde(default)]
    vip_count: i32,
}

// GET /api/cinemas
async fn list_cinemas(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CinemaSummary>>, AppError> {
    Ok(Json(state.store.list_cinemas().await?))
}

// POST /api/cinemas
#[derive(Debug, Deserialize, Validate)]
struct CreateCinemaRequest {
    #[validate(length(min = 1, max = 100))]
    city: String,
    #[validate(length(min = 1, max = 200))]
    location: String,
    #[validate(length(min = 1))]
    screens: Vec<ScreenRequest>,
}

async fn create_cinema(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateCinemaRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    req.validate()?;

    let screens = req
        .screens
        .iter()
        .map(|s| screen_layout(s.total_seats, s.vip_count))
        .collect::<Result<Vec<_>, _>>()?;
    let cinema = state
        .store
        .create_cinema(&NewCinema {
            city: req.city.trim().to_string(),
            location: req.location.trim().to_string(),
            screens,
        })
        .await?;
    info!(cinema_id = cinema.id, city = %cinema.city, screens = cinema.num_of_screens, "cinema created");

    Ok((StatusCode::CREATED, Json(cinema)))
}

// DELETE /api/cinemas/{id}
async fn delete_cinema(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(cinema_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    state.store.delete_cinema(cinema_id).await?;
    info!(cinema_id, by = %user.username, "cinema deleted");
    Ok(Json(serde_json::json!({ "message": "Cinema deleted" })))
}

// GET /api/cinemas/{id}/screens
async fn list_screens(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(cinema_id): Path<i64>,
) -> Result<Json<Vec<Screen>>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    if state.store.find_cinema(cinema_id).await?.is_none() {
        return Err(AppError::NotFound("Cinema not found".to_string()));
    }
    Ok(Json(state.store.list_screens(cinema_id).await?))
}

// POST /api/cinemas/{id}/screens
#[derive(Debug, Deserialize)]
struct AddScreenRequest {
    /// Defaults to one past the highest existing number.
    screen_number: Option<i32>,
    #[serde(flatten)]
    screen: ScreenRequest,
}

async fn add_screen(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(cinema_id): Path<i64>,
    JsonBody(req): JsonBody<AddScreenRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    let layout = screen_layout(req.screen.total_seats, req.screen.vip_count)?;

    let screen_number = match req.screen_number {
        Some(n) if n < 1 => return Err(AppError::Validation("Screen number must be positive".to_string())),
        Some(n) => n,
        None => {
            let existing = state.store.list_screens(cinema_id).await?;
            existing.iter().map(|s| s.screen_number).max().unwrap_or(0) + 1
        }
    };

    let screen = state.store.add_screen(cinema_id, screen_number, layout).await?;
    Ok((StatusCode::CREATED, Json(screen)))
}

// PUT /api/screens/{id}
async fn resize_screen(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(screen_id): Path<i64>,
    JsonBody(req): JsonBody<ScreenRequest>,
) -> Result<Json<Screen>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    let layout = screen_layout(req.total_seats, req.vip_count)?;
    Ok(Json(state.store.resize_screen(screen_id, layout).await?))
}

// DELETE /api/screens/{id}
async fn remove_screen(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(screen_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    state.store.remove_screen(screen_id).await?;
    info!(screen_id, by = %user.username, "screen removed");
    Ok(Json(serde_json::json!({ "message": "Screen removed" })))
}
