//! Booking and cancellation.
//!
//! Both operations take `now` from the caller so the time windows can be
//! tested at their exact boundaries. The seat locking and all writes happen
//! inside the store; this module only makes the decisions the store asks for.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::discount::{Discounts, ScreenLoad};
use crate::error::AppError;
use crate::models::{BookingGroup, Cancellation, Customer, Seat, SeatCategory};
use crate::pricing::{dynamic_price, round2};
use crate::store::{BookingDraft, CatalogStore, Store};

/// Showtimes further ahead than this cannot be booked yet.
pub const MAX_ADVANCE_DAYS: i64 = 7;
/// Cancellation is refused once the show is this close or closer.
pub const CANCELLATION_CUTOFF_HOURS: i64 = 24;
pub const REFUND_RATE: f64 = 0.5;

const REFERENCE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedSeat {
    pub seat_id: i64,
    pub seat_number: i32,
    pub category: SeatCategory,
    pub price: f64,
}

/// Prices for one booking group, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub seats: Vec<PricedSeat>,
    pub total: f64,
    pub discounts: Discounts,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub showtime_id: i64,
    pub customer: Customer,
    pub seat_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub booking_reference: String,
    pub showtime_id: i64,
    pub total_price: f64,
    pub discounts: Discounts,
    pub seats: Vec<PricedSeat>,
}

/// What a cancellation request names: a reference, or any row id of the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelTarget {
    Reference(String),
    BookingId(i64),
}

/// Each seat is priced and discounted on its own. Seat prices keep full
/// precision; only the total is rounded, so it matches a rounded sum of the
/// stored rows.
pub fn quote(city: &str, show_time: NaiveDateTime, now: NaiveDateTime, load: ScreenLoad, seats: &[Seat]) -> Quote {
    let discounts = Discounts::evaluate(show_time, now, load, seats.len());
    let seats: Vec<PricedSeat> = seats
        .iter()
        .map(|seat| PricedSeat {
            seat_id: seat.id,
            seat_number: seat.seat_number,
            category: seat.category,
            price: discounts.apply(dynamic_price(city, show_time, seat.category)),
        })
        .collect();
    let total = round2(seats.iter().map(|s| s.price).sum());
    Quote { seats, total, discounts }
}

pub fn check_booking_window(show_time: NaiveDateTime, now: NaiveDateTime) -> Result<(), AppError> {
    if show_time < now {
        return Err(AppError::Policy("Cannot book a showtime that has already started".to_string()));
    }
    if show_time > now + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(AppError::Policy(format!(
            "Bookings open {} days before the showtime",
            MAX_ADVANCE_DAYS
        )));
    }
    Ok(())
}

pub fn check_cancellation_window(show_time: NaiveDateTime, now: NaiveDateTime) -> Result<(), AppError> {
    if show_time - now <= Duration::hours(CANCELLATION_CUTOFF_HOURS) {
        return Err(AppError::Policy(format!(
            "Bookings cannot be cancelled within {} hours of the showtime",
            CANCELLATION_CUTOFF_HOURS
        )));
    }
    Ok(())
}

pub fn refund_for(group: &BookingGroup) -> f64 {
    round2(group.price_sum() * REFUND_RATE)
}

pub fn new_reference() -> String {
    Uuid::new_v4().simple().to_string()[..REFERENCE_LEN].to_string()
}

fn check_request(request: &BookingRequest) -> Result<(), AppError> {
    let customer = &request.customer;
    if customer.name.trim().is_empty() || customer.email.trim().is_empty() || customer.phone.trim().is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }
    if request.seat_ids.is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }
    let mut seen = HashSet::with_capacity(request.seat_ids.len());
    if let Some(dup) = request.seat_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::Validation(format!("Seat ID {} requested more than once", dup)));
    }
    Ok(())
}

pub async fn create_booking(
    store: &dyn Store,
    request: BookingRequest,
    staff_id: i64,
    now: NaiveDateTime,
) -> Result<BookingConfirmation, AppError> {
    check_request(&request)?;

    let showtime = store
        .showtime_details(request.showtime_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid showtime ID".to_string()))?;
    check_booking_window(showtime.show_time, now)?;

    let draft = BookingDraft {
        showtime_id: showtime.id,
        screen_id: showtime.screen_id,
        customer: request.customer,
        seat_ids: request.seat_ids,
        new_reference,
        staff_id,
        booked_at: now,
    };

    let city = showtime.city.as_str();
    let show_time = showtime.show_time;
    let booked = store
        .book_seats(&draft, &|load, seats| quote(city, show_time, now, load, seats))
        .await?;
    let priced = booked.quote;

    info!(
        reference = %booked.booking_reference,
        showtime_id = showtime.id,
        seats = priced.seats.len(),
        total = priced.total,
        "booking created"
    );

    Ok(BookingConfirmation {
        booking_reference: booked.booking_reference,
        showtime_id: showtime.id,
        total_price: priced.total,
        discounts: priced.discounts,
        seats: priced.seats,
    })
}

pub async fn cancel_booking(store: &dyn Store, target: CancelTarget, now: NaiveDateTime) -> Result<Cancellation, AppError> {
    let reference = match target {
        CancelTarget::Reference(reference) => reference,
        CancelTarget::BookingId(id) => store
            .resolve_reference(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?,
    };

    let cancellation = store
        .cancel_group(&reference, now, &|group| {
            check_cancellation_window(group.show_time, now)?;
            Ok(refund_for(group))
        })
        .await?;

    info!(
        reference = %cancellation.booking_reference,
        refund = cancellation.refund_amount,
        "booking cancelled"
    );
    Ok(cancellation)
}
