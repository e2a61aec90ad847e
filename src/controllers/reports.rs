//! Tabular reports for managers.
//!
//! Every report has the same shape: a title, column descriptors telling the
//! client how to render each key, and the rows themselves.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::{AuthUser, ADMIN_OR_MANAGER};
use crate::models::{CitySummary, FilmBookings, FilmRevenue, MonthlyRevenue, StaffPerformance};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/bookings-per-film", get(bookings_per_film))
        .route("/reports/monthly-revenue", get(monthly_revenue))
        .route("/reports/top-films", get(top_films))
        .route("/reports/staff-bookings", get(staff_bookings))
        .route("/reports/city-summary", get(city_summary))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFormat {
    Text,
    Number,
    Currency,
}

#[derive(Debug, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub display_name: &'static str,
    pub format: ColumnFormat,
}

const fn column(key: &'static str, display_name: &'static str, format: ColumnFormat) -> Column {
    Column { key, display_name, format }
}

#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub title: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<T>,
}

// GET /api/reports/bookings-per-film
async fn bookings_per_film(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Report<FilmBookings>>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    Ok(Json(Report {
        title: "Bookings per Film",
        columns: vec![
            column("title", "Film", ColumnFormat::Text),
            column("total_bookings", "Seats Booked", ColumnFormat::Number),
        ],
        rows: state.store.bookings_per_film().await?,
    }))
}

// GET /api/reports/monthly-revenue
async fn monthly_revenue(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Report<MonthlyRevenue>>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    Ok(Json(Report {
        title: "Monthly Revenue",
        columns: vec![
            column("month", "Month", ColumnFormat::Text),
            column("total_revenue", "Revenue", ColumnFormat::Currency),
        ],
        rows: state.store.monthly_revenue().await?,
    }))
}

// GET /api/reports/top-films
async fn top_films(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Report<FilmRevenue>>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    Ok(Json(Report {
        title: "Top Revenue Films",
        columns: vec![
            column("title", "Film", ColumnFormat::Text),
            column("genre", "Genre", ColumnFormat::Text),
            column("age_rating", "Rating", ColumnFormat::Text),
            column("booking_count", "Seats Booked", ColumnFormat::Number),
            column("total_revenue", "Revenue", ColumnFormat::Currency),
        ],
        rows: state.store.top_films().await?,
    }))
}

// GET /api/reports/staff-bookings
async fn staff_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Report<StaffPerformance>>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    Ok(Json(Report {
        title: "Monthly Staff Performance",
        columns: vec![
            column("month", "Month", ColumnFormat::Text),
            column("staff_name", "Staff", ColumnFormat::Text),
            column("booking_count", "Seats Booked", ColumnFormat::Number),
            column("total_revenue", "Revenue", ColumnFormat::Currency),
        ],
        rows: state.store.staff_bookings().await?,
    }))
}

// GET /api/reports/city-summary
async fn city_summary(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Report<CitySummary>>, AppError> {
    user.require(ADMIN_OR_MANAGER)?;
    Ok(Json(Report {
        title: "Bookings by City",
        columns: vec![
            column("city", "City", ColumnFormat::Text),
            column("total_bookings", "Seats Booked", ColumnFormat::Number),
            column("total_revenue", "Revenue", ColumnFormat::Currency),
        ],
        rows: state.store.city_summary().await?,
    }))
}
