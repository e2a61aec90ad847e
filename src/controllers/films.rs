use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::JsonBody;
use crate::error::AppError;
use crate::middleware::{AuthUser, ADMIN_OR_MANAGER};
use crate::models::{Film, FilmListing, Showtime};
use crate::store::{FilmInput, NewShowtime};
use crate::AppState;

pub const DEFAULT_TICKET_PRICE: f64 = 10.0;

const SHOW_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/films", get(list_films).post(create_film))
        .route("/films/{id}", put(update_film).delete(delete_film))
        .route("/showtimes", post(create_showtime))
}

/// Accepts ISO timestamps with or without seconds, as sent by `datetime-local` inputs.
fn show_time_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    SHOW_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid show time '{}'", raw)))
}

#[derive(Debug, Deserialize, Validate)]
struct FilmRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 50))]
    genre: String,
    #[validate(length(min = 1, max = 10))]
    age_rating: String,
    description: Option<String>,
}

impl FilmRequest {
    fn input(&self) -> FilmInput {
        FilmInput {
            title: self.title.trim().to_string(),
            genre: self.genre.trim().to_string(),
            age_rating: self.age_rating.trim().to_string(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShowtimeSlot {
    screen_number: i32,
    #[serde(deserialize_with = "show_time_from_str")]
    show_time: NaiveDateTime,
}

// GET /api/films?cinema_id=
#[derive(Debug, Deserialize)]
struct FilmsQuery {
    cinema_id: Option<i64>,
}

async fn list_films(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FilmsQuery>,
) -> Result<Json<Vec<FilmListing>>, AppError> {
    Ok(Json(state.store.list_films(q.cinema_id).await?))
}

// POST /api/films
#[derive(Debug, Deserialize, Validate)]
struct CreateFilmRequest {
    #[serde(flatten)]
    #[validate(nested)]
    film: FilmRequest,
    cinema_id: Option<i64>,
    #[validate(range(min = 0.0))]
    price: Option<f64>,
    #[serde(default)]
    showtimes: Vec<ShowtimeSlot>,
}

#[derive(Debug, Serialize)]
struct CreateFilmResponse {
    film: Film,
    showtimes: Vec<Showtime>,
}

async fn create_film(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateFilmRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    req.validate()?;

    let showtimes = match (req.cinema_id, req.showtimes.is_empty()) {
        (_, true) => Vec::new(),
        (Some(cinema_id), false) => req
            .showtimes
            .iter()
            .map(|slot| NewShowtime {
                cinema_id,
                screen_number: slot.screen_number,
                show_time: slot.show_time,
                price: req.price.unwrap_or(DEFAULT_TICKET_PRICE),
            })
            .collect(),
        (None, false) => return Err(AppError::Validation("cinema_id is required to schedule showtimes".to_string())),
    };

    let (film, showtimes) = state.store.create_film(&req.film.input(), &showtimes).await?;
    info!(film_id = film.id, title = %film.title, showtimes = showtimes.len(), by = %user.username, "film created");

    Ok((StatusCode::CREATED, Json(CreateFilmResponse { film, showtimes })))
}

// PUT /api/films/{id}
async fn update_film(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(film_id): Path<i64>,
    JsonBody(req): JsonBody<FilmRequest>,
) -> Result<Json<Film>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    req.validate()?;
    Ok(Json(state.store.update_film(film_id, &req.input()).await?))
}

// DELETE /api/films/{id}
async fn delete_film(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(film_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    state.store.delete_film(film_id).await?;
    info!(film_id, by = %user.username, "film deleted");
    Ok(Json(serde_json::json!({ "message": "Film deleted" })))
}

// POST /api/showtimes
#[derive(Debug, Deserialize, Validate)]
struct CreateShowtimeRequest {
    film_id: i64,
    cinema_id: i64,
    screen_number: i32,
    #[serde(deserialize_with = "show_time_from_str")]
    show_time: NaiveDateTime,
    #[validate(range(min = 0.0))]
    price: Option<f64>,
}

async fn create_showtime(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateShowtimeRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    req.validate()?;

    let showtime = NewShowtime {
        cinema_id: req.cinema_id,
        screen_number: req.screen_number,
        show_time: req.show_time,
        price: req.price.unwrap_or(DEFAULT_TICKET_PRICE),
    };
    let created = state.store.create_showtime(req.film_id, &showtime).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
