//! In-process store.
//!
//! All tables live behind one mutex. Every operation takes the lock once,
//! checks everything it needs, and only then mutates, so a failed operation
//! leaves no partial writes behind. The lock is never held across an await.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::discount::ScreenLoad;
use crate::error::AppError;
use crate::models::booking::{fold_groups, BookingGroupRow};
use crate::models::{
    BookingGroup, Cancellation, Cinema, CinemaSummary, CitySummary, Customer, Film, FilmBookings, FilmListing,
    FilmRevenue, MonthlyRevenue, Role, Screen, ScheduledShowtime, Seat, SeatLayout, Showtime, ShowtimeDetails,
    StaffPerformance, User,
};
use crate::pricing::round2;
use crate::store::{
    BookedGroup, BookingDraft, BookingStore, CatalogStore, FilmInput, NewCinema, NewShowtime, QuoteFn, ReportStore, SettleFn,
    UserStore, REFERENCE_ATTEMPTS,
};

#[derive(Debug, Clone)]
struct BookingRecord {
    id: i64,
    customer: Customer,
    showtime_id: i64,
    seat_id: i64,
    booking_reference: String,
    price: f64,
    staff_id: Option<i64>,
    booking_date: NaiveDateTime,
}

#[derive(Debug, Default)]
struct Sequences {
    users: i64,
    cinemas: i64,
    screens: i64,
    seats: i64,
    films: i64,
    showtimes: i64,
    bookings: i64,
    cancellations: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct State {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    cinemas: BTreeMap<i64, Cinema>,
    screens: BTreeMap<i64, Screen>,
    seats: BTreeMap<i64, Seat>,
    films: BTreeMap<i64, Film>,
    showtimes: BTreeMap<i64, Showtime>,
    bookings: BTreeMap<i64, BookingRecord>,
    cancellations: Vec<Cancellation>,
}

impl State {
    fn screen_by_number(&self, cinema_id: i64, screen_number: i32) -> Option<&Screen> {
        self.screens
            .values()
            .find(|s| s.cinema_id == cinema_id && s.screen_number == screen_number)
    }

    fn add_screen(&mut self, cinema_id: i64, screen_number: i32, layout: SeatLayout) -> Screen {
        let screen = Screen {
            id: next(&mut self.seq.screens),
            cinema_id,
            screen_number,
            total_seats: layout.total(),
        };
        self.screens.insert(screen.id, screen.clone());
        self.add_seats(screen.id, layout);
        screen
    }

    fn add_seats(&mut self, screen_id: i64, layout: SeatLayout) {
        for (seat_number, category) in layout.seats() {
            let id = next(&mut self.seq.seats);
            self.seats.insert(
                id,
                Seat { id, screen_id, seat_number, category, is_booked: false },
            );
        }
    }

    fn screen_has_bookings(&self, screen_id: i64) -> bool {
        self.bookings
            .values()
            .any(|b| self.seats.get(&b.seat_id).is_some_and(|s| s.screen_id == screen_id))
    }

    fn refresh_screen_count(&mut self, cinema_id: i64) {
        let count = self.screens.values().filter(|s| s.cinema_id == cinema_id).count() as i32;
        if let Some(cinema) = self.cinemas.get_mut(&cinema_id) {
            cinema.num_of_screens = count;
        }
    }

    fn refresh_seat_flags(&mut self, seat_ids: &[i64]) {
        for seat_id in seat_ids {
            let booked = self.bookings.values().any(|b| b.seat_id == *seat_id);
            if let Some(seat) = self.seats.get_mut(seat_id) {
                seat.is_booked = booked;
            }
        }
    }

    fn remove_showtimes(&mut self, keep: impl Fn(&Showtime) -> bool) {
        let removed: HashSet<i64> = self.showtimes.values().filter(|s| !keep(s)).map(|s| s.id).collect();
        self.showtimes.retain(|id, _| !removed.contains(id));
        let released: Vec<i64> = self
            .bookings
            .values()
            .filter(|b| removed.contains(&b.showtime_id))
            .map(|b| b.seat_id)
            .collect();
        self.bookings.retain(|_, b| !removed.contains(&b.showtime_id));
        self.refresh_seat_flags(&released);
    }

    fn insert_showtime(&mut self, film_id: i64, showtime: &NewShowtime) -> Showtime {
        let created = Showtime {
            id: next(&mut self.seq.showtimes),
            film_id,
            cinema_id: showtime.cinema_id,
            screen_number: showtime.screen_number,
            show_time: showtime.show_time,
            price: showtime.price,
        };
        self.showtimes.insert(created.id, created.clone());
        created
    }

    fn check_screen(&self, showtime: &NewShowtime) -> Result<(), AppError> {
        match self.screen_by_number(showtime.cinema_id, showtime.screen_number) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!(
                "Screen {} not found in cinema {}",
                showtime.screen_number, showtime.cinema_id
            ))),
        }
    }

    fn details(&self, showtime_id: i64) -> Option<ShowtimeDetails> {
        let showtime = self.showtimes.get(&showtime_id)?;
        let film = self.films.get(&showtime.film_id)?;
        let cinema = self.cinemas.get(&showtime.cinema_id)?;
        let screen = self.screen_by_number(showtime.cinema_id, showtime.screen_number)?;
        Some(ShowtimeDetails {
            id: showtime.id,
            film_id: film.id,
            film_title: film.title.clone(),
            cinema_id: cinema.id,
            city: cinema.city.clone(),
            screen_id: screen.id,
            screen_number: showtime.screen_number,
            show_time: showtime.show_time,
            price: showtime.price,
        })
    }

    /// Joined rows for the bookings accepted by `filter`, ordered by id.
    fn group_rows(&self, filter: impl Fn(&BookingRecord) -> bool) -> Vec<BookingGroupRow> {
        self.bookings
            .values()
            .filter(|b| filter(b))
            .filter_map(|b| {
                let showtime = self.showtimes.get(&b.showtime_id)?;
                let film = self.films.get(&showtime.film_id)?;
                let cinema = self.cinemas.get(&showtime.cinema_id)?;
                let seat = self.seats.get(&b.seat_id)?;
                Some(BookingGroupRow {
                    booking_id: b.id,
                    booking_reference: b.booking_reference.clone(),
                    customer_name: b.customer.name.clone(),
                    customer_email: b.customer.email.clone(),
                    customer_phone: b.customer.phone.clone(),
                    showtime_id: showtime.id,
                    film_title: film.title.clone(),
                    show_time: showtime.show_time,
                    screen_number: showtime.screen_number,
                    city: cinema.city.clone(),
                    location: cinema.location.clone(),
                    staff_name: b
                        .staff_id
                        .and_then(|id| self.users.get(&id))
                        .map(|u| u.username.clone()),
                    booking_date: b.booking_date,
                    seat_id: seat.id,
                    seat_number: seat.seat_number,
                    total_price: b.price,
                })
            })
            .collect()
    }

    fn film_of_booking(&self, booking: &BookingRecord) -> Option<&Film> {
        let showtime = self.showtimes.get(&booking.showtime_id)?;
        self.films.get(&showtime.film_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let state = self.lock();
        Ok(state
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        let mut state = self.lock();
        if state.users.values().any(|u| u.username.eq_ignore_ascii_case(username)) {
            return Err(AppError::Conflict(format!("Username '{}' is already taken", username)));
        }
        let user = User {
            id: next(&mut state.seq.users),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_cinemas(&self) -> Result<Vec<CinemaSummary>, AppError> {
        let state = self.lock();
        let mut cinemas: Vec<CinemaSummary> = state
            .cinemas
            .values()
            .map(|c| CinemaSummary {
                id: c.id,
                city: c.city.clone(),
                location: c.location.clone(),
                num_of_screens: state.screens.values().filter(|s| s.cinema_id == c.id).count() as i64,
            })
            .collect();
        cinemas.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| a.location.cmp(&b.location)));
        Ok(cinemas)
    }

    async fn find_cinema(&self, cinema_id: i64) -> Result<Option<Cinema>, AppError> {
        Ok(self.lock().cinemas.get(&cinema_id).cloned())
    }

    async fn create_cinema(&self, cinema: &NewCinema) -> Result<Cinema, AppError> {
        let mut state = self.lock();
        let created = Cinema {
            id: next(&mut state.seq.cinemas),
            city: cinema.city.clone(),
            location: cinema.location.clone(),
            num_of_screens: cinema.screens.len() as i32,
        };
        state.cinemas.insert(created.id, created.clone());
        for (index, layout) in cinema.screens.iter().enumerate() {
            state.add_screen(created.id, index as i32 + 1, *layout);
        }
        Ok(created)
    }

    async fn delete_cinema(&self, cinema_id: i64) -> Result<(), AppError> {
        let mut state = self.lock();
        let booked = state.bookings.values().any(|b| {
            state
                .showtimes
                .get(&b.showtime_id)
                .is_some_and(|s| s.cinema_id == cinema_id)
        });
        if booked {
            return Err(AppError::Conflict("Cinema has active bookings".to_string()));
        }
        if state.cinemas.remove(&cinema_id).is_none() {
            return Err(AppError::NotFound("Cinema not found".to_string()));
        }
        let screens: HashSet<i64> = state
            .screens
            .values()
            .filter(|s| s.cinema_id == cinema_id)
            .map(|s| s.id)
            .collect();
        state.screens.retain(|id, _| !screens.contains(id));
        state.seats.retain(|_, seat| !screens.contains(&seat.screen_id));
        state.remove_showtimes(|s| s.cinema_id != cinema_id);
        Ok(())
    }

    async fn list_screens(&self, cinema_id: i64) -> Result<Vec<Screen>, AppError> {
        let state = self.lock();
        let mut screens: Vec<Screen> = state
            .screens
            .values()
            .filter(|s| s.cinema_id == cinema_id)
            .cloned()
            .collect();
        screens.sort_by_key(|s| s.screen_number);
        Ok(screens)
    }

    async fn add_screen(&self, cinema_id: i64, screen_number: i32, layout: SeatLayout) -> Result<Screen, AppError> {
        let mut state = self.lock();
        if !state.cinemas.contains_key(&cinema_id) {
            return Err(AppError::NotFound("Cinema not found".to_string()));
        }
        if state.screen_by_number(cinema_id, screen_number).is_some() {
            return Err(AppError::Conflict(format!("Screen {} already exists", screen_number)));
        }
        let screen = state.add_screen(cinema_id, screen_number, layout);
        state.refresh_screen_count(cinema_id);
        Ok(screen)
    }

    async fn resize_screen(&self, screen_id: i64, layout: SeatLayout) -> Result<Screen, AppError> {
        let mut state = self.lock();
        if !state.screens.contains_key(&screen_id) {
            return Err(AppError::NotFound("Screen not found".to_string()));
        }
        if state.screen_has_bookings(screen_id) {
            return Err(AppError::Conflict("Screen has active bookings".to_string()));
        }
        state.seats.retain(|_, seat| seat.screen_id != screen_id);
        state.add_seats(screen_id, layout);
        let screen = state
            .screens
            .get_mut(&screen_id)
            .ok_or_else(|| AppError::NotFound("Screen not found".to_string()))?;
        screen.total_seats = layout.total();
        Ok(screen.clone())
    }

    async fn remove_screen(&self, screen_id: i64) -> Result<(), AppError> {
        let mut state = self.lock();
        let screen = state
            .screens
            .get(&screen_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Screen not found".to_string()))?;
        if state.screen_has_bookings(screen_id) {
            return Err(AppError::Conflict("Screen has active bookings".to_string()));
        }
        state.remove_showtimes(|s| !(s.cinema_id == screen.cinema_id && s.screen_number == screen.screen_number));
        state.screens.remove(&screen_id);
        state.seats.retain(|_, seat| seat.screen_id != screen_id);
        state.refresh_screen_count(screen.cinema_id);
        Ok(())
    }

    async fn list_films(&self, cinema_id: Option<i64>) -> Result<Vec<FilmListing>, AppError> {
        let state = self.lock();
        let mut listings: Vec<FilmListing> = state
            .films
            .values()
            .filter_map(|film| {
                let mut showtimes: Vec<NaiveDateTime> = state
                    .showtimes
                    .values()
                    .filter(|s| s.film_id == film.id && cinema_id.map_or(true, |c| s.cinema_id == c))
                    .map(|s| s.show_time)
                    .collect();
                if cinema_id.is_some() && showtimes.is_empty() {
                    return None;
                }
                showtimes.sort();
                Some(FilmListing { film: film.clone(), showtimes })
            })
            .collect();
        listings.sort_by(|a, b| a.film.title.cmp(&b.film.title).then(a.film.id.cmp(&b.film.id)));
        Ok(listings)
    }

    async fn create_film(&self, film: &FilmInput, showtimes: &[NewShowtime]) -> Result<(Film, Vec<Showtime>), AppError> {
        let mut state = self.lock();
        for showtime in showtimes {
            state.check_screen(showtime)?;
        }
        let created = Film {
            id: next(&mut state.seq.films),
            title: film.title.clone(),
            genre: film.genre.clone(),
            age_rating: film.age_rating.clone(),
            description: film.description.clone(),
        };
        state.films.insert(created.id, created.clone());
        let scheduled = showtimes
            .iter()
            .map(|showtime| state.insert_showtime(created.id, showtime))
            .collect();
        Ok((created, scheduled))
    }

    async fn update_film(&self, film_id: i64, film: &FilmInput) -> Result<Film, AppError> {
        let mut state = self.lock();
        let existing = state
            .films
            .get_mut(&film_id)
            .ok_or_else(|| AppError::NotFound("Film not found".to_string()))?;
        existing.title = film.title.clone();
        existing.genre = film.genre.clone();
        existing.age_rating = film.age_rating.clone();
        existing.description = film.description.clone();
        Ok(existing.clone())
    }

    async fn delete_film(&self, film_id: i64) -> Result<(), AppError> {
        let mut state = self.lock();
        if state.films.remove(&film_id).is_none() {
            return Err(AppError::NotFound("Film not found".to_string()));
        }
        state.remove_showtimes(|s| s.film_id != film_id);
        Ok(())
    }

    async fn create_showtime(&self, film_id: i64, showtime: &NewShowtime) -> Result<Showtime, AppError> {
        let mut state = self.lock();
        if !state.films.contains_key(&film_id) {
            return Err(AppError::NotFound("Film not found".to_string()));
        }
        state.check_screen(showtime)?;
        Ok(state.insert_showtime(film_id, showtime))
    }

    async fn cinema_schedule(&self, cinema_id: i64, date: NaiveDate) -> Result<Vec<ScheduledShowtime>, AppError> {
        let state = self.lock();
        let mut schedule: Vec<ScheduledShowtime> = state
            .showtimes
            .values()
            .filter(|s| s.cinema_id == cinema_id && s.show_time.date() == date)
            .filter_map(|s| {
                let film = state.films.get(&s.film_id)?;
                Some(ScheduledShowtime {
                    id: s.id,
                    film_id: film.id,
                    title: film.title.clone(),
                    screen_number: s.screen_number,
                    show_time: s.show_time,
                    price: s.price,
                })
            })
            .collect();
        schedule.sort_by(|a, b| a.show_time.cmp(&b.show_time).then(a.screen_number.cmp(&b.screen_number)));
        Ok(schedule)
    }

    async fn showtime_details(&self, showtime_id: i64) -> Result<Option<ShowtimeDetails>, AppError> {
        Ok(self.lock().details(showtime_id))
    }

    async fn seat_map(&self, showtime: &ShowtimeDetails) -> Result<Vec<(Seat, bool)>, AppError> {
        let state = self.lock();
        let booked: HashSet<i64> = state
            .bookings
            .values()
            .filter(|b| b.showtime_id == showtime.id)
            .map(|b| b.seat_id)
            .collect();
        let mut seats: Vec<(Seat, bool)> = state
            .seats
            .values()
            .filter(|s| s.screen_id == showtime.screen_id)
            .map(|s| (s.clone(), booked.contains(&s.id)))
            .collect();
        seats.sort_by_key(|(s, _)| s.seat_number);
        Ok(seats)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn book_seats(&self, draft: &BookingDraft, quote: &QuoteFn<'_>) -> Result<BookedGroup, AppError> {
        let mut state = self.lock();

        let mut seats = Vec::with_capacity(draft.seat_ids.len());
        for seat_id in &draft.seat_ids {
            match state.seats.get(seat_id) {
                Some(seat) if seat.screen_id == draft.screen_id => seats.push(seat.clone()),
                _ => return Err(AppError::NotFound(format!("Seat ID {} not found", seat_id))),
            }
        }

        let requested: HashSet<i64> = draft.seat_ids.iter().copied().collect();
        let booked_for_showtime: Vec<&BookingRecord> = state
            .bookings
            .values()
            .filter(|b| b.showtime_id == draft.showtime_id)
            .collect();
        if booked_for_showtime.iter().any(|b| requested.contains(&b.seat_id)) {
            return Err(AppError::Conflict("One or more selected seats are already booked".to_string()));
        }

        let load = ScreenLoad {
            total_seats: state.seats.values().filter(|s| s.screen_id == draft.screen_id).count() as i64,
            booked_seats: booked_for_showtime.len() as i64,
        };
        let priced = quote(load, &seats);
        let reference = (0..REFERENCE_ATTEMPTS)
            .map(|_| (draft.new_reference)())
            .find(|candidate| !state.bookings.values().any(|b| &b.booking_reference == candidate))
            .ok_or_else(|| AppError::Internal("Could not allocate a booking reference".to_string()))?;

        for seat in &priced.seats {
            let id = next(&mut state.seq.bookings);
            state.bookings.insert(
                id,
                BookingRecord {
                    id,
                    customer: draft.customer.clone(),
                    showtime_id: draft.showtime_id,
                    seat_id: seat.seat_id,
                    booking_reference: reference.clone(),
                    price: seat.price,
                    staff_id: Some(draft.staff_id),
                    booking_date: draft.booked_at,
                },
            );
            if let Some(stored) = state.seats.get_mut(&seat.seat_id) {
                stored.is_booked = true;
            }
        }
        Ok(BookedGroup { booking_reference: reference, quote: priced })
    }

    async fn resolve_reference(&self, booking_id: i64) -> Result<Option<String>, AppError> {
        Ok(self
            .lock()
            .bookings
            .get(&booking_id)
            .map(|b| b.booking_reference.clone()))
    }

    async fn booking_group(&self, reference: &str) -> Result<Option<BookingGroup>, AppError> {
        let rows = self.lock().group_rows(|b| b.booking_reference == reference);
        Ok(fold_groups(rows).into_iter().next())
    }

    async fn search_bookings(&self, query: &str) -> Result<Vec<BookingGroup>, AppError> {
        let mut rows = self
            .lock()
            .group_rows(|b| b.booking_reference == query || b.customer.email.eq_ignore_ascii_case(query));
        rows.sort_by(|a, b| {
            b.booking_date
                .cmp(&a.booking_date)
                .then_with(|| a.booking_reference.cmp(&b.booking_reference))
                .then(a.booking_id.cmp(&b.booking_id))
        });
        Ok(fold_groups(rows))
    }

    async fn cancel_group(
        &self,
        reference: &str,
        cancelled_at: NaiveDateTime,
        settle: &SettleFn<'_>,
    ) -> Result<Cancellation, AppError> {
        let mut state = self.lock();
        let group = fold_groups(state.group_rows(|b| b.booking_reference == reference))
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let refund = settle(&group)?;
        let seat_ids: Vec<i64> = group.seats.iter().map(|s| s.seat_id).collect();

        state.bookings.retain(|_, b| b.booking_reference != reference);
        state.refresh_seat_flags(&seat_ids);

        let cancellation = Cancellation {
            id: next(&mut state.seq.cancellations),
            booking_id: group.first_booking_id().unwrap_or_default(),
            booking_reference: reference.to_string(),
            cancellation_date: cancelled_at,
            refund_amount: refund,
        };
        state.cancellations.push(cancellation.clone());
        Ok(cancellation)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn bookings_per_film(&self) -> Result<Vec<FilmBookings>, AppError> {
        let state = self.lock();
        let mut counts: HashMap<i64, FilmBookings> = HashMap::new();
        for booking in state.bookings.values() {
            if let Some(film) = state.film_of_booking(booking) {
                counts
                    .entry(film.id)
                    .or_insert_with(|| FilmBookings { title: film.title.clone(), total_bookings: 0 })
                    .total_bookings += 1;
            }
        }
        let mut rows: Vec<FilmBookings> = counts.into_values().collect();
        rows.sort_by(|a, b| b.total_bookings.cmp(&a.total_bookings).then_with(|| a.title.cmp(&b.title)));
        Ok(rows)
    }

    async fn monthly_revenue(&self) -> Result<Vec<MonthlyRevenue>, AppError> {
        let state = self.lock();
        let mut months: BTreeMap<String, f64> = BTreeMap::new();
        for booking in state.bookings.values() {
            *months.entry(booking.booking_date.format("%Y-%m").to_string()).or_default() += booking.price;
        }
        Ok(months
            .into_iter()
            .map(|(month, total)| MonthlyRevenue { month, total_revenue: round2(total) })
            .collect())
    }

    async fn top_films(&self) -> Result<Vec<FilmRevenue>, AppError> {
        let state = self.lock();
        let mut films: HashMap<i64, FilmRevenue> = HashMap::new();
        for booking in state.bookings.values() {
            if let Some(film) = state.film_of_booking(booking) {
                let entry = films.entry(film.id).or_insert_with(|| FilmRevenue {
                    title: film.title.clone(),
                    total_revenue: 0.0,
                    booking_count: 0,
                    genre: film.genre.clone(),
                    age_rating: film.age_rating.clone(),
                });
                entry.total_revenue += booking.price;
                entry.booking_count += 1;
            }
        }
        let mut rows: Vec<FilmRevenue> = films
            .into_values()
            .map(|r| FilmRevenue { total_revenue: round2(r.total_revenue), ..r })
            .collect();
        rows.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(rows)
    }

    async fn staff_bookings(&self) -> Result<Vec<StaffPerformance>, AppError> {
        let state = self.lock();
        let mut staff: HashMap<(String, i64), StaffPerformance> = HashMap::new();
        for booking in state.bookings.values() {
            let Some(user) = booking.staff_id.and_then(|id| state.users.get(&id)) else {
                continue;
            };
            let month = booking.booking_date.format("%Y-%m").to_string();
            let entry = staff.entry((month.clone(), user.id)).or_insert_with(|| StaffPerformance {
                month,
                staff_name: user.username.clone(),
                booking_count: 0,
                total_revenue: 0.0,
            });
            entry.booking_count += 1;
            entry.total_revenue += booking.price;
        }
        let mut rows: Vec<StaffPerformance> = staff
            .into_values()
            .map(|r| StaffPerformance { total_revenue: round2(r.total_revenue), ..r })
            .collect();
        rows.sort_by(|a, b| {
            b.month
                .cmp(&a.month)
                .then(b.booking_count.cmp(&a.booking_count))
                .then_with(|| a.staff_name.cmp(&b.staff_name))
        });
        Ok(rows)
    }

    async fn city_summary(&self) -> Result<Vec<CitySummary>, AppError> {
        let state = self.lock();
        let mut cities: BTreeMap<String, (i64, f64)> = state
            .cinemas
            .values()
            .map(|c| (c.city.clone(), (0, 0.0)))
            .collect();
        for booking in state.bookings.values() {
            let city = state
                .showtimes
                .get(&booking.showtime_id)
                .and_then(|s| state.cinemas.get(&s.cinema_id))
                .map(|c| c.city.clone());
            if let Some(entry) = city.and_then(|c| cities.get_mut(&c)) {
                entry.0 += 1;
                entry.1 += booking.price;
            }
        }
        Ok(cities
            .into_iter()
            .map(|(city, (total_bookings, total))| CitySummary { city, total_bookings, total_revenue: round2(total) })
            .collect())
    }
}
