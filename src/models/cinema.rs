use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cinema {
    pub id: i64,
    pub city: String,
    pub location: String,
    pub num_of_screens: i32,
}

/// Cinema with the number of screens actually configured.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CinemaSummary {
    pub id: i64,
    pub city: String,
    pub location: String,
    pub num_of_screens: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Screen {
    pub id: i64,
    pub cinema_id: i64,
    pub screen_number: i32,
    pub total_seats: i32,
}
