//! Persistence boundary.
//!
//! Every read and write the service performs goes through these traits, so
//! handlers and services never see raw rows. [`PgStore`] is the production
//! implementation; [`MemoryStore`] keeps everything behind one mutex and is
//! used when no database is configured and by the tests.
//!
//! Operations that must be atomic (booking a group of seats, cancelling a
//! group) take the business decision as a callback and run it inside the
//! store's transaction, after the relevant rows are locked.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::discount::ScreenLoad;
use crate::error::AppError;
use crate::models::{
    BookingGroup, Cancellation, Cinema, CinemaSummary, CitySummary, Customer, Film, FilmBookings,
    FilmListing, FilmRevenue, MonthlyRevenue, Role, Screen, ScheduledShowtime, Seat, SeatLayout,
    Showtime, ShowtimeDetails, StaffPerformance, User,
};
use crate::services::booking::Quote;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Prices a group of locked seats given the screen's current load.
pub type QuoteFn<'a> = dyn Fn(ScreenLoad, &[Seat]) -> Quote + Send + Sync + 'a;

/// Decides whether a locked group may be cancelled and returns the refund.
pub type SettleFn<'a> = dyn Fn(&BookingGroup) -> Result<f64, AppError> + Send + Sync + 'a;

#[derive(Debug, Clone)]
pub struct NewCinema {
    pub city: String,
    pub location: String,
    /// One layout per screen; screens are numbered from 1 in this order.
    pub screens: Vec<SeatLayout>,
}

#[derive(Debug, Clone)]
pub struct FilmInput {
    pub title: String,
    pub genre: String,
    pub age_rating: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewShowtime {
    pub cinema_id: i64,
    pub screen_number: i32,
    pub show_time: NaiveDateTime,
    pub price: f64,
}

/// Candidate references tried before a booking gives up.
pub(crate) const REFERENCE_ATTEMPTS: usize = 5;

/// A validated booking request, ready to be written.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub showtime_id: i64,
    pub screen_id: i64,
    pub customer: Customer,
    pub seat_ids: Vec<i64>,
    /// Produces candidate references; one already used by another group is skipped.
    pub new_reference: fn() -> String,
    pub staff_id: i64,
    pub booked_at: NaiveDateTime,
}

/// What `book_seats` wrote: the group's reference and its prices.
#[derive(Debug, Clone)]
pub struct BookedGroup {
    pub booking_reference: String,
    pub quote: Quote,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, AppError>;

    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_cinemas(&self) -> Result<Vec<CinemaSummary>, AppError>;

    async fn find_cinema(&self, cinema_id: i64) -> Result<Option<Cinema>, AppError>;

    /// Creates the cinema, its screens and every seat in one transaction.
    async fn create_cinema(&self, cinema: &NewCinema) -> Result<Cinema, AppError>;

    /// Refused while any showtime of the cinema has bookings.
    async fn delete_cinema(&self, cinema_id: i64) -> Result<(), AppError>;

    async fn list_screens(&self, cinema_id: i64) -> Result<Vec<Screen>, AppError>;

    async fn add_screen(&self, cinema_id: i64, screen_number: i32, layout: SeatLayout) -> Result<Screen, AppError>;

    /// Replaces every seat of the screen. Refused while its seats are booked.
    async fn resize_screen(&self, screen_id: i64, layout: SeatLayout) -> Result<Screen, AppError>;

    /// Removes the screen with its seats and showtimes. Refused while its seats are booked.
    async fn remove_screen(&self, screen_id: i64) -> Result<(), AppError>;

    /// Films with their show times; with a cinema, only films showing there.
    async fn list_films(&self, cinema_id: Option<i64>) -> Result<Vec<FilmListing>, AppError>;

    /// Creates the film and its initial showtimes atomically.
    async fn create_film(&self, film: &FilmInput, showtimes: &[NewShowtime]) -> Result<(Film, Vec<Showtime>), AppError>;

    async fn update_film(&self, film_id: i64, film: &FilmInput) -> Result<Film, AppError>;

    /// Deletes the film, its showtimes and their bookings, releasing the seats.
    async fn delete_film(&self, film_id: i64) -> Result<(), AppError>;

    async fn create_showtime(&self, film_id: i64, showtime: &NewShowtime) -> Result<Showtime, AppError>;

    async fn cinema_schedule(&self, cinema_id: i64, date: NaiveDate) -> Result<Vec<ScheduledShowtime>, AppError>;

    async fn showtime_details(&self, showtime_id: i64) -> Result<Option<ShowtimeDetails>, AppError>;

    /// Seats of the showtime's screen, each paired with whether it is booked
    /// for this showtime.
    async fn seat_map(&self, showtime: &ShowtimeDetails) -> Result<Vec<(Seat, bool)>, AppError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Locks the requested seats, checks they are free for the showtime,
    /// prices them with `quote` and writes one booking row per seat.
    /// Nothing is written unless every seat can be booked. The group gets a
    /// reference no other group holds.
    async fn book_seats(&self, draft: &BookingDraft, quote: &QuoteFn<'_>) -> Result<BookedGroup, AppError>;

    async fn resolve_reference(&self, booking_id: i64) -> Result<Option<String>, AppError>;

    async fn booking_group(&self, reference: &str) -> Result<Option<BookingGroup>, AppError>;

    /// Groups matching a booking reference or a customer email.
    async fn search_bookings(&self, query: &str) -> Result<Vec<BookingGroup>, AppError>;

    /// Locks the group, asks `settle` for the refund, then deletes the rows,
    /// releases the seats and records the cancellation.
    async fn cancel_group(
        &self,
        reference: &str,
        cancelled_at: NaiveDateTime,
        settle: &SettleFn<'_>,
    ) -> Result<Cancellation, AppError>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn bookings_per_film(&self) -> Result<Vec<FilmBookings>, AppError>;

    async fn monthly_revenue(&self) -> Result<Vec<MonthlyRevenue>, AppError>;

    async fn top_films(&self) -> Result<Vec<FilmRevenue>, AppError>;

    async fn staff_bookings(&self) -> Result<Vec<StaffPerformance>, AppError>;

    async fn city_summary(&self) -> Result<Vec<CitySummary>, AppError>;
}

pub trait Store: UserStore + CatalogStore + BookingStore + ReportStore {}

impl<T> Store for T where T: UserStore + CatalogStore + BookingStore + ReportStore {}
