use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::warn;

use super::{refresh_seat_flags, PgStore, BOOKING_GROUP_SELECT};
use crate::discount::ScreenLoad;
use crate::error::AppError;
use crate::models::booking::{fold_groups, BookingGroupRow};
use crate::models::seat::SeatRow;
use crate::models::{BookingGroup, Cancellation, Seat};
use crate::store::{BookedGroup, BookingDraft, BookingStore, QuoteFn, SettleFn, REFERENCE_ATTEMPTS};

/// Picks a reference no existing group uses. The advisory lock is held until
/// the transaction ends, so two bookings cannot both claim the same one.
async fn claim_reference(conn: &mut PgConnection, generate: fn() -> String) -> Result<String, AppError> {
    for _ in 0..REFERENCE_ATTEMPTS {
        let reference = generate();
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&reference)
            .execute(&mut *conn)
            .await?;
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE booking_reference = $1)")
            .bind(&reference)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(reference);
        }
        warn!(reference = %reference, "booking reference already in use");
    }
    Err(AppError::Internal("Could not allocate a booking reference".to_string()))
}

#[async_trait]
impl BookingStore for PgStore {
    async fn book_seats(&self, draft: &BookingDraft, quote: &QuoteFn<'_>) -> Result<BookedGroup, AppError> {
        let mut tx = self.pool().begin().await?;

        // Seats stay locked until commit; availability is checked under the lock.
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT id, screen_id, seat_number, seat_type, is_booked
             FROM seats
             WHERE id = ANY($1)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(&draft.seat_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut locked: HashMap<i64, Seat> = rows.into_iter().map(|row| (row.id, Seat::from(row))).collect();
        let mut seats = Vec::with_capacity(draft.seat_ids.len());
        for seat_id in &draft.seat_ids {
            match locked.remove(seat_id) {
                Some(seat) if seat.screen_id == draft.screen_id => seats.push(seat),
                _ => return Err(AppError::NotFound(format!("Seat ID {} not found", seat_id))),
            }
        }

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE showtime_id = $1 AND seat_id = ANY($2))",
        )
        .bind(draft.showtime_id)
        .bind(&draft.seat_ids)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(AppError::Conflict("One or more selected seats are already booked".to_string()));
        }

        let (total_seats, booked_seats): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM seats WHERE screen_id = $1),
                    (SELECT COUNT(*) FROM bookings WHERE showtime_id = $2)",
        )
        .bind(draft.screen_id)
        .bind(draft.showtime_id)
        .fetch_one(&mut *tx)
        .await?;

        let priced = quote(ScreenLoad { total_seats, booked_seats }, &seats);
        let reference = claim_reference(&mut tx, draft.new_reference).await?;
        let (seat_ids, prices): (Vec<i64>, Vec<f64>) = priced.seats.iter().map(|s| (s.seat_id, s.price)).unzip();

        sqlx::query(
            "INSERT INTO bookings (customer_name, customer_email, customer_phone, showtime_id, seat_id,
                                   booking_reference, total_price, booking_staff_id, booking_date)
             SELECT $1, $2, $3, $4, u.seat_id, $5, u.price, $6, $7
             FROM UNNEST($8::int8[], $9::float8[]) AS u(seat_id, price)",
        )
        .bind(&draft.customer.name)
        .bind(&draft.customer.email)
        .bind(&draft.customer.phone)
        .bind(draft.showtime_id)
        .bind(&reference)
        .bind(draft.staff_id)
        .bind(draft.booked_at)
        .bind(&seat_ids)
        .bind(&prices)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE seats SET is_booked = TRUE WHERE id = ANY($1)")
            .bind(&seat_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(BookedGroup { booking_reference: reference, quote: priced })
    }

    async fn resolve_reference(&self, booking_id: i64) -> Result<Option<String>, AppError> {
        let reference = sqlx::query_scalar("SELECT booking_reference FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(reference)
    }

    async fn booking_group(&self, reference: &str) -> Result<Option<BookingGroup>, AppError> {
        let rows: Vec<BookingGroupRow> =
            sqlx::query_as(&format!("{BOOKING_GROUP_SELECT} WHERE b.booking_reference = $1 ORDER BY b.id"))
                .bind(reference)
                .fetch_all(self.pool())
                .await?;
        Ok(fold_groups(rows).into_iter().next())
    }

    async fn search_bookings(&self, query: &str) -> Result<Vec<BookingGroup>, AppError> {
        let rows: Vec<BookingGroupRow> = sqlx::query_as(&format!(
            "{BOOKING_GROUP_SELECT}
             WHERE b.booking_reference = $1 OR LOWER(b.customer_email) = LOWER($1)
             ORDER BY b.booking_date DESC, b.booking_reference, b.id"
        ))
        .bind(query)
        .fetch_all(self.pool())
        .await?;
        Ok(fold_groups(rows))
    }

    async fn cancel_group(
        &self,
        reference: &str,
        cancelled_at: NaiveDateTime,
        settle: &SettleFn<'_>,
    ) -> Result<Cancellation, AppError> {
        let mut tx = self.pool().begin().await?;

        // A second cancellation of the same group waits here and then finds no rows.
        let rows: Vec<BookingGroupRow> = sqlx::query_as(&format!(
            "{BOOKING_GROUP_SELECT} WHERE b.booking_reference = $1 ORDER BY b.id FOR UPDATE OF b"
        ))
        .bind(reference)
        .fetch_all(&mut *tx)
        .await?;
        let group = fold_groups(rows)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let refund = settle(&group)?;
        let seat_ids: Vec<i64> = group.seats.iter().map(|s| s.seat_id).collect();
        let first_booking_id = group.first_booking_id().unwrap_or_default();

        sqlx::query("DELETE FROM bookings WHERE booking_reference = $1")
            .bind(reference)
            .execute(&mut *tx)
            .await?;
        refresh_seat_flags(&mut tx, &seat_ids).await?;

        let cancellation: Cancellation = sqlx::query_as(
            "INSERT INTO cancellations (booking_id, booking_reference, cancellation_date, refund_amount)
             VALUES ($1, $2, $3, $4)
             RETURNING id, booking_id, booking_reference, cancellation_date, refund_amount",
        )
        .bind(first_booking_id)
        .bind(reference)
        .bind(cancelled_at)
        .bind(refund)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cancellation)
    }
}
