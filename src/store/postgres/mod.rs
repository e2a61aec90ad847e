//! Postgres implementation of the store traits, one file per trait.

use sqlx::{PgConnection, PgPool};

use crate::database::Database;

mod bookings;
mod catalog;
mod reports;
mod users;

#[derive(Debug, Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}

/// Booking rows joined with everything a receipt shows.
pub(crate) const BOOKING_GROUP_SELECT: &str = r#"
    SELECT b.id AS booking_id, b.booking_reference, b.customer_name, b.customer_email,
           b.customer_phone, b.showtime_id, f.title AS film_title, st.show_time,
           st.screen_number, c.city, c.location, u.username AS staff_name,
           b.booking_date, b.seat_id, s.seat_number, b.total_price
    FROM bookings b
    JOIN showtimes st ON st.id = b.showtime_id
    JOIN films f ON f.id = st.film_id
    JOIN cinemas c ON c.id = st.cinema_id
    JOIN seats s ON s.id = b.seat_id
    LEFT JOIN users u ON u.id = b.booking_staff_id
"#;

/// Re-derives `is_booked` for the given seats from the remaining bookings.
pub(crate) async fn refresh_seat_flags(conn: &mut PgConnection, seat_ids: &[i64]) -> Result<(), sqlx::Error> {
    if seat_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "UPDATE seats s
         SET is_booked = EXISTS(SELECT 1 FROM bookings b WHERE b.seat_id = s.id)
         WHERE s.id = ANY($1)",
    )
    .bind(seat_ids)
    .execute(conn)
    .await?;
    Ok(())
}

/// Keeps `cinemas.num_of_screens` in step with the screens table.
pub(crate) async fn refresh_screen_count(conn: &mut PgConnection, cinema_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE cinemas
         SET num_of_screens = (SELECT COUNT(*) FROM screens WHERE cinema_id = $1)
         WHERE id = $1",
    )
    .bind(cinema_id)
    .execute(conn)
    .await?;
    Ok(())
}
