use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::{local_now, JsonBody};
use crate::discount::Discounts;
use crate::error::AppError;
use crate::middleware::{AuthUser, ANY_STAFF};
use crate::models::{BookingGroup, Cancellation, Customer};
use crate::services::booking::{cancel_booking, create_booking, BookingRequest, CancelTarget, PricedSeat};
use crate::store::BookingStore;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(book).get(search_bookings))
        .route("/bookings/cancel", post(cancel))
        .route("/bookings/{reference}", get(receipt))
}

/* ---------- request parsing ---------- */

/// Ids arrive as numbers or as numeric strings from form posts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn parse(&self) -> Option<i64> {
        match self {
            IdValue::Number(n) => Some(*n),
            IdValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// `[1, 2]`, `["1", "2"]` or `"1,2"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SeatIds {
    List(Vec<IdValue>),
    Joined(String),
}

impl SeatIds {
    fn parse(&self) -> Result<Vec<i64>, AppError> {
        let raw: Vec<IdValue> = match self {
            SeatIds::List(ids) => ids.clone(),
            SeatIds::Joined(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| IdValue::Text(part.to_string()))
                .collect(),
        };
        raw.iter()
            .map(|id| {
                id.parse()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| AppError::Validation(format!("Invalid seat ID {:?}", id)))
            })
            .collect()
    }
}

fn required(value: Option<String>) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("Missing required fields".to_string()))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    showtime_id: Option<IdValue>,
    #[validate(length(max = 100))]
    customer_name: Option<String>,
    #[validate(email)]
    customer_email: Option<String>,
    #[validate(length(max = 30))]
    customer_phone: Option<String>,
    seat_ids: Option<SeatIds>,
}

#[derive(Debug, Serialize)]
struct CreateBookingResponse {
    message: String,
    booking_reference: String,
    total_price: f64,
    discounts: Discounts,
    seats: Vec<PricedSeat>,
}

async fn book(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(ANY_STAFF)?;

    let (Some(showtime_id), Some(seat_ids)) = (req.showtime_id.as_ref(), req.seat_ids.as_ref()) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };
    let name = required(req.customer_name.clone())?;
    let email = required(req.customer_email.clone())?;
    let phone = required(req.customer_phone.clone())?;
    req.validate()?;

    let showtime_id = showtime_id
        .parse()
        .ok_or_else(|| AppError::Validation("Invalid showtime ID".to_string()))?;
    let request = BookingRequest {
        showtime_id,
        customer: Customer { name, email, phone },
        seat_ids: seat_ids.parse()?,
    };

    let confirmation = create_booking(state.store.as_ref(), request, user.user_id, local_now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking successful".to_string(),
            booking_reference: confirmation.booking_reference,
            total_price: confirmation.total_price,
            discounts: confirmation.discounts,
            seats: confirmation.seats,
        }),
    ))
}

/// A booking group as shown to staff: the rows plus their derived totals.
#[derive(Debug, Serialize)]
struct Receipt {
    #[serde(flatten)]
    group: BookingGroup,
    seat_numbers: Vec<i32>,
    total_price: f64,
}

impl From<BookingGroup> for Receipt {
    fn from(group: BookingGroup) -> Self {
        Receipt {
            seat_numbers: group.seat_numbers(),
            total_price: group.total_price(),
            group,
        }
    }
}

// GET /api/bookings?query=
#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: Option<String>,
}

async fn search_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Receipt>>, AppError> {
    user.require(ANY_STAFF)?;
    let query = q
        .query
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Enter a booking reference or email".to_string()))?;

    let groups = state.store.search_bookings(query).await?;
    Ok(Json(groups.into_iter().map(Receipt::from).collect()))
}

// GET /api/bookings/{reference}
async fn receipt(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(reference): Path<String>,
) -> Result<Json<Receipt>, AppError> {
    user.require(ANY_STAFF)?;
    let group = state
        .store
        .booking_group(reference.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    Ok(Json(Receipt::from(group)))
}

// POST /api/bookings/cancel
#[derive(Debug, Deserialize)]
struct CancelRequest {
    booking_reference: Option<String>,
    booking_id: Option<IdValue>,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    message: String,
    booking_reference: String,
    refund_amount: f64,
    cancellation: Cancellation,
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    user.require(ANY_STAFF)?;

    let reference = req.booking_reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let target = match (reference, req.booking_id) {
        (Some(reference), _) => CancelTarget::Reference(reference),
        (None, Some(id)) => CancelTarget::BookingId(
            id.parse()
                .ok_or_else(|| AppError::Validation("Invalid booking ID".to_string()))?,
        ),
        (None, None) => return Err(AppError::Validation("Booking reference or ID is required".to_string())),
    };

    let cancellation = cancel_booking(state.store.as_ref(), target, local_now()).await?;
    tracing::info!(by = %user.username, reference = %cancellation.booking_reference, "cancellation recorded");

    Ok(Json(CancelResponse {
        message: format!("Booking cancelled. Refund: £{:.2}", cancellation.refund_amount),
        booking_reference: cancellation.booking_reference.clone(),
        refund_amount: cancellation.refund_amount,
        cancellation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_ids_accept_lists_and_joined_strings() {
        let list: SeatIds = serde_json::from_str("[3, \"4\"]").unwrap();
        assert_eq!(list.parse().unwrap(), vec![3, 4]);
        let joined: SeatIds = serde_json::from_str("\"5, 6,7\"").unwrap();
        assert_eq!(joined.parse().unwrap(), vec![5, 6, 7]);
        let bad: SeatIds = serde_json::from_str("\"5,x\"").unwrap();
        assert!(bad.parse().is_err());
    }
}
