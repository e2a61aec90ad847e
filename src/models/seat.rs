use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Seat classes. Anything that is not an Upper Gallery or VIP seat is priced
/// as a standard Lower Hall seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatCategory {
    #[serde(rename = "Lower Hall")]
    LowerHall,
    #[serde(rename = "Upper Gallery")]
    UpperGallery,
    #[serde(rename = "VIP")]
    Vip,
}

impl SeatCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SeatCategory::LowerHall => "Lower Hall",
            SeatCategory::UpperGallery => "Upper Gallery",
            SeatCategory::Vip => "VIP",
        }
    }

    /// Accepts the stored labels as well as `upper_gallery` style spellings.
    pub fn from_label(label: &str) -> SeatCategory {
        let normalized = label.trim().replace('_', " ").to_ascii_lowercase();
        match normalized.as_str() {
            "upper gallery" => SeatCategory::UpperGallery,
            "vip" => SeatCategory::Vip,
            _ => SeatCategory::LowerHall,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Seat {
    pub id: i64,
    pub screen_id: i64,
    pub seat_number: i32,
    pub category: SeatCategory,
    pub is_booked: bool,
}

#[derive(Debug, FromRow)]
pub(crate) struct SeatRow {
    pub id: i64,
    pub screen_id: i64,
    pub seat_number: i32,
    pub seat_type: String,
    pub is_booked: bool,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            id: row.id,
            screen_id: row.screen_id,
            seat_number: row.seat_number,
            category: SeatCategory::from_label(&row.seat_type),
            is_booked: row.is_booked,
        }
    }
}

/// A seat as seen from one showtime: booked means booked for that showtime.
#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub id: i64,
    pub seat_number: i32,
    pub seat_type: SeatCategory,
    pub is_booked: bool,
    pub price: f64,
}

pub const MIN_SCREEN_SEATS: i32 = 50;
pub const MAX_SCREEN_SEATS: i32 = 120;

/// How a screen's seats are split between categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatLayout {
    pub lower_hall: i32,
    pub upper_gallery: i32,
    pub vip: i32,
}

impl SeatLayout {
    /// 30% Lower Hall (rounded), then up to `vip_requested` VIP seats from
    /// what is left, the remainder is Upper Gallery.
    pub fn generate(total_seats: i32, vip_requested: i32) -> SeatLayout {
        let total = total_seats.max(0);
        let lower_hall = (total as f64 * 0.3).round() as i32;
        let vip = vip_requested.max(0).min(total - lower_hall);
        SeatLayout {
            lower_hall,
            upper_gallery: total - lower_hall - vip,
            vip,
        }
    }

    pub fn total(&self) -> i32 {
        self.lower_hall + self.upper_gallery + self.vip
    }

    /// Seat numbers starting at 1: Lower Hall first, then Upper Gallery, then VIP.
    pub fn seats(&self) -> Vec<(i32, SeatCategory)> {
        let categories = std::iter::repeat(SeatCategory::LowerHall)
            .take(self.lower_hall as usize)
            .chain(std::iter::repeat(SeatCategory::UpperGallery).take(self.upper_gallery as usize))
            .chain(std::iter::repeat(SeatCategory::Vip).take(self.vip as usize));
        categories
            .enumerate()
            .map(|(i, category)| (i as i32 + 1, category))
            .collect()
    }
}
