use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Film {
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub age_rating: String,
    pub description: Option<String>,
}

/// A film together with the start times of its showtimes.
#[derive(Debug, Clone, Serialize)]
pub struct FilmListing {
    #[serde(flatten)]
    pub film: Film,
    pub showtimes: Vec<NaiveDateTime>,
}
