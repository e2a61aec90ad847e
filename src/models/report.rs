use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct FilmBookings {
    pub title: String,
    pub total_bookings: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct FilmRevenue {
    pub title: String,
    pub total_revenue: f64,
    pub booking_count: i64,
    pub genre: String,
    pub age_rating: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct StaffPerformance {
    pub month: String,
    pub staff_name: String,
    pub booking_count: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub total_bookings: i64,
    pub total_revenue: f64,
}
