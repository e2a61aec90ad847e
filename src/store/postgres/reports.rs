use async_trait::async_trait;

use super::PgStore;
use crate::error::AppError;
use crate::models::{CitySummary, FilmBookings, FilmRevenue, MonthlyRevenue, StaffPerformance};
use crate::pricing::round2;
use crate::store::ReportStore;

#[async_trait]
impl ReportStore for PgStore {
    async fn bookings_per_film(&self) -> Result<Vec<FilmBookings>, AppError> {
        let rows = sqlx::query_as(
            "SELECT f.title, COUNT(b.id) AS total_bookings
             FROM films f
             JOIN showtimes st ON st.film_id = f.id
             JOIN bookings b ON b.showtime_id = st.id
             GROUP BY f.id, f.title
             ORDER BY total_bookings DESC, f.title",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn monthly_revenue(&self) -> Result<Vec<MonthlyRevenue>, AppError> {
        let rows: Vec<MonthlyRevenue> = sqlx::query_as(
            "SELECT to_char(booking_date, 'YYYY-MM') AS month, SUM(total_price)::float8 AS total_revenue
             FROM bookings
             GROUP BY month
             ORDER BY month",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| MonthlyRevenue { total_revenue: round2(r.total_revenue), ..r })
            .collect())
    }

    async fn top_films(&self) -> Result<Vec<FilmRevenue>, AppError> {
        let rows: Vec<FilmRevenue> = sqlx::query_as(
            "SELECT f.title, SUM(b.total_price)::float8 AS total_revenue, COUNT(b.id) AS booking_count,
                    f.genre, f.age_rating
             FROM films f
             JOIN showtimes st ON st.film_id = f.id
             JOIN bookings b ON b.showtime_id = st.id
             GROUP BY f.id, f.title, f.genre, f.age_rating
             ORDER BY total_revenue DESC, f.title",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| FilmRevenue { total_revenue: round2(r.total_revenue), ..r })
            .collect())
    }

    async fn staff_bookings(&self) -> Result<Vec<StaffPerformance>, AppError> {
        let rows: Vec<StaffPerformance> = sqlx::query_as(
            "SELECT to_char(b.booking_date, 'YYYY-MM') AS month, u.username AS staff_name,
                    COUNT(b.id) AS booking_count, SUM(b.total_price)::float8 AS total_revenue
             FROM bookings b
             JOIN users u ON u.id = b.booking_staff_id
             GROUP BY month, u.id, u.username
             ORDER BY month DESC, booking_count DESC, u.username",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StaffPerformance { total_revenue: round2(r.total_revenue), ..r })
            .collect())
    }

    async fn city_summary(&self) -> Result<Vec<CitySummary>, AppError> {
        let rows: Vec<CitySummary> = sqlx::query_as(
            "SELECT c.city, COUNT(b.id) AS total_bookings, COALESCE(SUM(b.total_price), 0)::float8 AS total_revenue
             FROM cinemas c
             LEFT JOIN showtimes st ON st.cinema_id = c.id
             LEFT JOIN bookings b ON b.showtime_id = st.id
             GROUP BY c.city
             ORDER BY c.city",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| CitySummary { total_revenue: round2(r.total_revenue), ..r })
            .collect())
    }
}
