use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// One row of a booking group.
#[derive(Debug, Clone, Serialize)]
pub struct BookedSeat {
    pub booking_id: i64,
    pub seat_id: i64,
    pub seat_number: i32,
    pub price: f64,
}

/// All booking rows sharing one reference, with the showtime they belong to.
#[derive(Debug, Clone, Serialize)]
pub struct BookingGroup {
    pub booking_reference: String,
    pub customer: Customer,
    pub showtime_id: i64,
    pub film_title: String,
    pub show_time: NaiveDateTime,
    pub screen_number: i32,
    pub city: String,
    pub location: String,
    pub staff_name: Option<String>,
    pub booking_date: NaiveDateTime,
    pub seats: Vec<BookedSeat>,
}

impl BookingGroup {
    /// Unrounded sum of the stored seat prices.
    pub fn price_sum(&self) -> f64 {
        self.seats.iter().map(|s| s.price).sum()
    }

    pub fn total_price(&self) -> f64 {
        crate::pricing::round2(self.price_sum())
    }

    pub fn seat_numbers(&self) -> Vec<i32> {
        self.seats.iter().map(|s| s.seat_number).collect()
    }

    /// Lowest row id of the group, used as the cancellation's booking id.
    pub fn first_booking_id(&self) -> Option<i64> {
        self.seats.iter().map(|s| s.booking_id).min()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cancellation {
    pub id: i64,
    pub booking_id: i64,
    pub booking_reference: String,
    pub cancellation_date: NaiveDateTime,
    pub refund_amount: f64,
}

// Flat row of the group query; folded into `BookingGroup` by reference.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct BookingGroupRow {
    pub booking_id: i64,
    pub booking_reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub showtime_id: i64,
    pub film_title: String,
    pub show_time: NaiveDateTime,
    pub screen_number: i32,
    pub city: String,
    pub location: String,
    pub staff_name: Option<String>,
    pub booking_date: NaiveDateTime,
    pub seat_id: i64,
    pub seat_number: i32,
    pub total_price: f64,
}

/// Groups rows by reference, keeping the order in which references first appear.
pub(crate) fn fold_groups(rows: Vec<BookingGroupRow>) -> Vec<BookingGroup> {
    let mut groups: Vec<BookingGroup> = Vec::new();
    for row in rows {
        let seat = BookedSeat {
            booking_id: row.booking_id,
            seat_id: row.seat_id,
            seat_number: row.seat_number,
            price: row.total_price,
        };
        match groups.iter_mut().find(|g| g.booking_reference == row.booking_reference) {
            Some(group) => group.seats.push(seat),
            None => groups.push(BookingGroup {
                booking_reference: row.booking_reference,
                customer: Customer {
                    name: row.customer_name,
                    email: row.customer_email,
                    phone: row.customer_phone,
                },
                showtime_id: row.showtime_id,
                film_title: row.film_title,
                show_time: row.show_time,
                screen_number: row.screen_number,
                city: row.city,
                location: row.location,
                staff_name: row.staff_name,
                booking_date: row.booking_date,
                seats: vec![seat],
            }),
        }
    }
    groups
}
