use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Showtime {
    pub id: i64,
    pub film_id: i64,
    pub cinema_id: i64,
    pub screen_number: i32,
    pub show_time: NaiveDateTime,
    pub price: f64,
}

/// Showtime joined with everything booking needs: the cinema's city, the
/// film title and the screen the seats belong to.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShowtimeDetails {
    pub id: i64,
    pub film_id: i64,
    pub film_title: String,
    pub cinema_id: i64,
    pub city: String,
    pub screen_id: i64,
    pub screen_number: i32,
    pub show_time: NaiveDateTime,
    pub price: f64,
}

/// One slot in a cinema's daily schedule.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduledShowtime {
    pub id: i64,
    pub film_id: i64,
    pub title: String,
    pub screen_number: i32,
    pub show_time: NaiveDateTime,
    pub price: f64,
}
