use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::local_now;
use crate::error::AppError;
use crate::middleware::{AuthUser, ANY_STAFF};
use crate::models::{Cinema, ScheduledShowtime};
use crate::services::catalog::{seat_map, SeatMap};
use crate::store::CatalogStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinemas/{id}/schedule", get(cinema_schedule))
        .route("/showtimes/{id}/seats", get(showtime_seats))
}

// GET /api/cinemas/{id}/schedule?date=YYYY-MM-DD
#[derive(Debug, Deserialize)]
struct ScheduleQuery {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    cinema: Cinema,
    date: NaiveDate,
    showtimes: Vec<ScheduledShowtime>,
}

async fn cinema_schedule(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(cinema_id): Path<i64>,
    Query(q): Query<ScheduleQuery>,
) -> Result<Json<ScheduleResponse>, AppError> {
    user.require(ANY_STAFF)?;

    let date = match q.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("Invalid date, expected YYYY-MM-DD".to_string()))?,
        None => local_now().date(),
    };

    let cinema = state
        .store
        .find_cinema(cinema_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cinema not found".to_string()))?;
    let showtimes = state.store.cinema_schedule(cinema_id, date).await?;

    Ok(Json(ScheduleResponse { cinema, date, showtimes }))
}

// GET /api/showtimes/{id}/seats
async fn showtime_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(showtime_id): Path<i64>,
) -> Result<Json<SeatMap>, AppError> {
    user.require(ANY_STAFF)?;
    Ok(Json(seat_map(state.store.as_ref(), showtime_id, local_now()).await?))
}
