use chrono::NaiveDateTime;
use serde::Serialize;

use crate::discount::{last_minute_applies, ScreenLoad};
use crate::error::AppError;
use crate::models::seat::{MAX_SCREEN_SEATS, MIN_SCREEN_SEATS};
use crate::models::{SeatLayout, SeatView, ShowtimeDetails};
use crate::pricing::dynamic_price;
use crate::store::{CatalogStore, Store};

#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    pub showtime: ShowtimeDetails,
    /// Whether a booking made now would get the last-minute discount.
    pub discount_eligible: bool,
    pub seats: Vec<SeatView>,
}

pub async fn seat_map(store: &dyn Store, showtime_id: i64, now: NaiveDateTime) -> Result<SeatMap, AppError> {
    let showtime = store
        .showtime_details(showtime_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;

    let seats = store.seat_map(&showtime).await?;
    let load = ScreenLoad {
        total_seats: seats.len() as i64,
        booked_seats: seats.iter().filter(|(_, booked)| *booked).count() as i64,
    };

    let views = seats
        .into_iter()
        .map(|(seat, booked)| SeatView {
            id: seat.id,
            seat_number: seat.seat_number,
            seat_type: seat.category,
            is_booked: booked,
            price: dynamic_price(&showtime.city, showtime.show_time, seat.category),
        })
        .collect();

    Ok(SeatMap {
        discount_eligible: last_minute_applies(showtime.show_time, now, load),
        showtime,
        seats: views,
    })
}

pub fn screen_layout(total_seats: i32, vip_count: i32) -> Result<SeatLayout, AppError> {
    if !(MIN_SCREEN_SEATS..=MAX_SCREEN_SEATS).contains(&total_seats) {
        return Err(AppError::Validation(format!(
            "A screen must have between {} and {} seats",
            MIN_SCREEN_SEATS, MAX_SCREEN_SEATS
        )));
    }
    if vip_count < 0 {
        return Err(AppError::Validation("VIP seat count cannot be negative".to_string()));
    }
    Ok(SeatLayout::generate(total_seats, vip_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_size_limits_are_inclusive() {
        assert!(screen_layout(50, 5).is_ok());
        assert!(screen_layout(120, 5).is_ok());
        assert!(screen_layout(49, 5).is_err());
        assert!(screen_layout(121, 5).is_err());
        assert!(screen_layout(80, -1).is_err());
    }
}
