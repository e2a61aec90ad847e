//! Dynamic seat pricing.
//!
//! The base price depends on the cinema's city and on the time slot the show
//! starts in; the seat category then adds a markup on top of it.

use chrono::{NaiveDateTime, Timelike};

use crate::models::SeatCategory;

/// Markup applied once for Upper Gallery and twice for VIP.
pub const CATEGORY_MARKUP: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSlot {
    /// 08:00 to 12:00
    Morning,
    /// 12:00 to 17:00
    Afternoon,
    /// everything else, including late night and early morning
    Evening,
}

impl TimeSlot {
    pub fn from_hour(hour: u32) -> TimeSlot {
        match hour {
            8..=11 => TimeSlot::Morning,
            12..=16 => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }

    fn index(self) -> usize {
        match self {
            TimeSlot::Morning => 0,
            TimeSlot::Afternoon => 1,
            TimeSlot::Evening => 2,
        }
    }
}

const DEFAULT_TIERS: [f64; 3] = [6.0, 7.0, 8.0];

/// Base price tiers (morning, afternoon, evening) for a city.
pub fn city_tiers(city: &str) -> [f64; 3] {
    match city {
        "Birmingham" => [5.0, 6.0, 7.0],
        "Bristol" => [6.0, 7.0, 8.0],
        "Cardiff" => [5.0, 6.0, 7.0],
        "London" => [10.0, 11.0, 12.0],
        _ => DEFAULT_TIERS,
    }
}

pub fn base_price(city: &str, show_time: NaiveDateTime) -> f64 {
    city_tiers(city)[TimeSlot::from_hour(show_time.hour()).index()]
}

/// Price of one seat before discounts, rounded to pence.
pub fn dynamic_price(city: &str, show_time: NaiveDateTime, category: SeatCategory) -> f64 {
    let base = base_price(city, show_time);
    let price = match category {
        SeatCategory::LowerHall => base,
        SeatCategory::UpperGallery => base * CATEGORY_MARKUP,
        SeatCategory::Vip => base * CATEGORY_MARKUP * CATEGORY_MARKUP,
    };
    round2(price)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
