use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, PgConnection};

use super::{refresh_screen_count, refresh_seat_flags, PgStore};
use crate::error::AppError;
use crate::models::seat::SeatRow;
use crate::models::{
    Cinema, CinemaSummary, Film, FilmListing, Screen, ScheduledShowtime, Seat, SeatLayout, Showtime, ShowtimeDetails,
};
use crate::store::{CatalogStore, FilmInput, NewCinema, NewShowtime};

#[derive(FromRow)]
struct FilmShowRow {
    id: i64,
    title: String,
    genre: String,
    age_rating: String,
    description: Option<String>,
    show_time: Option<NaiveDateTime>,
}

#[derive(FromRow)]
struct SeatMapRow {
    #[sqlx(flatten)]
    seat: SeatRow,
    booked_for_showtime: bool,
}

async fn insert_seats(conn: &mut PgConnection, screen_id: i64, layout: SeatLayout) -> Result<(), sqlx::Error> {
    let (numbers, labels): (Vec<i32>, Vec<String>) = layout
        .seats()
        .into_iter()
        .map(|(number, category)| (number, category.label().to_string()))
        .unzip();
    sqlx::query(
        "INSERT INTO seats (screen_id, seat_number, seat_type)
         SELECT $1, n, t FROM UNNEST($2::int4[], $3::text[]) AS u(n, t)",
    )
    .bind(screen_id)
    .bind(&numbers)
    .bind(&labels)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_screen(
    conn: &mut PgConnection,
    cinema_id: i64,
    screen_number: i32,
    layout: SeatLayout,
) -> Result<Screen, AppError> {
    let screen: Screen = sqlx::query_as(
        "INSERT INTO screens (cinema_id, screen_number, total_seats)
         VALUES ($1, $2, $3)
         RETURNING id, cinema_id, screen_number, total_seats",
    )
    .bind(cinema_id)
    .bind(screen_number)
    .bind(layout.total())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict(format!("Screen {} already exists", screen_number)),
        other => other,
    })?;
    insert_seats(conn, screen.id, layout).await?;
    Ok(screen)
}

async fn insert_showtime(conn: &mut PgConnection, film_id: i64, showtime: &NewShowtime) -> Result<Showtime, AppError> {
    let screen_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM screens WHERE cinema_id = $1 AND screen_number = $2)")
            .bind(showtime.cinema_id)
            .bind(showtime.screen_number)
            .fetch_one(&mut *conn)
            .await?;
    if !screen_exists {
        return Err(AppError::NotFound(format!(
            "Screen {} not found in cinema {}",
            showtime.screen_number, showtime.cinema_id
        )));
    }

    let created = sqlx::query_as(
        "INSERT INTO showtimes (film_id, cinema_id, screen_number, show_time, price)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, film_id, cinema_id, screen_number, show_time, price",
    )
    .bind(film_id)
    .bind(showtime.cinema_id)
    .bind(showtime.screen_number)
    .bind(showtime.show_time)
    .bind(showtime.price)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

/// Locks the screen and refuses if any of its seats carries a booking.
async fn lock_unbooked_screen(conn: &mut PgConnection, screen_id: i64) -> Result<Screen, AppError> {
    let screen: Screen =
        sqlx::query_as("SELECT id, cinema_id, screen_number, total_seats FROM screens WHERE id = $1 FOR UPDATE")
            .bind(screen_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Screen not found".to_string()))?;

    let booked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM bookings b JOIN seats s ON s.id = b.seat_id WHERE s.screen_id = $1)",
    )
    .bind(screen_id)
    .fetch_one(conn)
    .await?;
    if booked {
        return Err(AppError::Conflict("Screen has active bookings".to_string()));
    }
    Ok(screen)
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_cinemas(&self) -> Result<Vec<CinemaSummary>, AppError> {
        let cinemas = sqlx::query_as(
            "SELECT c.id, c.city, c.location, COUNT(s.id) AS num_of_screens
             FROM cinemas c
             LEFT JOIN screens s ON s.cinema_id = c.id
             GROUP BY c.id
             ORDER BY c.city, c.location",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(cinemas)
    }

    async fn find_cinema(&self, cinema_id: i64) -> Result<Option<Cinema>, AppError> {
        let cinema = sqlx::query_as("SELECT id, city, location, num_of_screens FROM cinemas WHERE id = $1")
            .bind(cinema_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(cinema)
    }

    async fn create_cinema(&self, cinema: &NewCinema) -> Result<Cinema, AppError> {
        let mut tx = self.pool().begin().await?;

        let created: Cinema = sqlx::query_as(
            "INSERT INTO cinemas (city, location, num_of_screens)
             VALUES ($1, $2, $3)
             RETURNING id, city, location, num_of_screens",
        )
        .bind(&cinema.city)
        .bind(&cinema.location)
        .bind(cinema.screens.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        for (index, layout) in cinema.screens.iter().enumerate() {
            insert_screen(&mut tx, created.id, index as i32 + 1, *layout).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn delete_cinema(&self, cinema_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        let booked: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM bookings b JOIN showtimes st ON st.id = b.showtime_id
                 WHERE st.cinema_id = $1
             )",
        )
        .bind(cinema_id)
        .fetch_one(&mut *tx)
        .await?;
        if booked {
            return Err(AppError::Conflict("Cinema has active bookings".to_string()));
        }

        let deleted = sqlx::query("DELETE FROM cinemas WHERE id = $1")
            .bind(cinema_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Cinema not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_screens(&self, cinema_id: i64) -> Result<Vec<Screen>, AppError> {
        let screens = sqlx::query_as(
            "SELECT id, cinema_id, screen_number, total_seats FROM screens WHERE cinema_id = $1 ORDER BY screen_number",
        )
        .bind(cinema_id)
        .fetch_all(self.pool())
        .await?;
        Ok(screens)
    }

    async fn add_screen(&self, cinema_id: i64, screen_number: i32, layout: SeatLayout) -> Result<Screen, AppError> {
        let mut tx = self.pool().begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cinemas WHERE id = $1)")
            .bind(cinema_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Cinema not found".to_string()));
        }

        let screen = insert_screen(&mut tx, cinema_id, screen_number, layout).await?;
        refresh_screen_count(&mut tx, cinema_id).await?;

        tx.commit().await?;
        Ok(screen)
    }

    async fn resize_screen(&self, screen_id: i64, layout: SeatLayout) -> Result<Screen, AppError> {
        let mut tx = self.pool().begin().await?;
        lock_unbooked_screen(&mut tx, screen_id).await?;

        sqlx::query("DELETE FROM seats WHERE screen_id = $1")
            .bind(screen_id)
            .execute(&mut *tx)
            .await?;
        insert_seats(&mut tx, screen_id, layout).await?;

        let screen: Screen = sqlx::query_as(
            "UPDATE screens SET total_seats = $2 WHERE id = $1
             RETURNING id, cinema_id, screen_number, total_seats",
        )
        .bind(screen_id)
        .bind(layout.total())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(screen)
    }

    async fn remove_screen(&self, screen_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;
        let screen = lock_unbooked_screen(&mut tx, screen_id).await?;

        sqlx::query("DELETE FROM showtimes WHERE cinema_id = $1 AND screen_number = $2")
            .bind(screen.cinema_id)
            .bind(screen.screen_number)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM screens WHERE id = $1")
            .bind(screen_id)
            .execute(&mut *tx)
            .await?;
        refresh_screen_count(&mut tx, screen.cinema_id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_films(&self, cinema_id: Option<i64>) -> Result<Vec<FilmListing>, AppError> {
        let rows: Vec<FilmShowRow> = match cinema_id {
            Some(cinema_id) => {
                sqlx::query_as(
                    "SELECT f.id, f.title, f.genre, f.age_rating, f.description, st.show_time
                     FROM films f
                     JOIN showtimes st ON st.film_id = f.id AND st.cinema_id = $1
                     ORDER BY f.title, f.id, st.show_time",
                )
                .bind(cinema_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT f.id, f.title, f.genre, f.age_rating, f.description, st.show_time
                     FROM films f
                     LEFT JOIN showtimes st ON st.film_id = f.id
                     ORDER BY f.title, f.id, st.show_time",
                )
                .fetch_all(self.pool())
                .await?
            }
        };

        let mut listings: Vec<FilmListing> = Vec::new();
        for row in rows {
            match listings.last_mut() {
                Some(listing) if listing.film.id == row.id => listing.showtimes.extend(row.show_time),
                _ => listings.push(FilmListing {
                    film: Film {
                        id: row.id,
                        title: row.title,
                        genre: row.genre,
                        age_rating: row.age_rating,
                        description: row.description,
                    },
                    showtimes: row.show_time.into_iter().collect(),
                }),
            }
        }
        Ok(listings)
    }

    async fn create_film(&self, film: &FilmInput, showtimes: &[NewShowtime]) -> Result<(Film, Vec<Showtime>), AppError> {
        let mut tx = self.pool().begin().await?;

        let created: Film = sqlx::query_as(
            "INSERT INTO films (title, genre, age_rating, description)
             VALUES ($1, $2, $3, $4)
             RETURNING id, title, genre, age_rating, description",
        )
        .bind(&film.title)
        .bind(&film.genre)
        .bind(&film.age_rating)
        .bind(&film.description)
        .fetch_one(&mut *tx)
        .await?;

        let mut scheduled = Vec::with_capacity(showtimes.len());
        for showtime in showtimes {
            scheduled.push(insert_showtime(&mut tx, created.id, showtime).await?);
        }

        tx.commit().await?;
        Ok((created, scheduled))
    }

    async fn update_film(&self, film_id: i64, film: &FilmInput) -> Result<Film, AppError> {
        let updated: Option<Film> = sqlx::query_as(
            "UPDATE films SET title = $2, genre = $3, age_rating = $4, description = $5
             WHERE id = $1
             RETURNING id, title, genre, age_rating, description",
        )
        .bind(film_id)
        .bind(&film.title)
        .bind(&film.genre)
        .bind(&film.age_rating)
        .bind(&film.description)
        .fetch_optional(self.pool())
        .await?;
        updated.ok_or_else(|| AppError::NotFound("Film not found".to_string()))
    }

    async fn delete_film(&self, film_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        let released: Vec<i64> = sqlx::query_scalar(
            "DELETE FROM bookings b USING showtimes st
             WHERE b.showtime_id = st.id AND st.film_id = $1
             RETURNING b.seat_id",
        )
        .bind(film_id)
        .fetch_all(&mut *tx)
        .await?;
        refresh_seat_flags(&mut tx, &released).await?;

        let deleted = sqlx::query("DELETE FROM films WHERE id = $1")
            .bind(film_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Film not found".to_string()));
        }

        tx.commit().await?;
        tracing::info!(film_id, released_seats = released.len(), "film deleted");
        Ok(())
    }

    async fn create_showtime(&self, film_id: i64, showtime: &NewShowtime) -> Result<Showtime, AppError> {
        let mut tx = self.pool().begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM films WHERE id = $1)")
            .bind(film_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Film not found".to_string()));
        }

        let created = insert_showtime(&mut tx, film_id, showtime).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn cinema_schedule(&self, cinema_id: i64, date: NaiveDate) -> Result<Vec<ScheduledShowtime>, AppError> {
        let schedule = sqlx::query_as(
            "SELECT st.id, st.film_id, f.title, st.screen_number, st.show_time, st.price
             FROM showtimes st
             JOIN films f ON f.id = st.film_id
             WHERE st.cinema_id = $1 AND st.show_time::date = $2
             ORDER BY st.show_time, st.screen_number",
        )
        .bind(cinema_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;
        Ok(schedule)
    }

    async fn showtime_details(&self, showtime_id: i64) -> Result<Option<ShowtimeDetails>, AppError> {
        let details = sqlx::query_as(
            "SELECT st.id, st.film_id, f.title AS film_title, st.cinema_id, c.city,
                    sc.id AS screen_id, st.screen_number, st.show_time, st.price
             FROM showtimes st
             JOIN films f ON f.id = st.film_id
             JOIN cinemas c ON c.id = st.cinema_id
             JOIN screens sc ON sc.cinema_id = st.cinema_id AND sc.screen_number = st.screen_number
             WHERE st.id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(details)
    }

    async fn seat_map(&self, showtime: &ShowtimeDetails) -> Result<Vec<(Seat, bool)>, AppError> {
        let rows: Vec<SeatMapRow> = sqlx::query_as(
            "SELECT s.id, s.screen_id, s.seat_number, s.seat_type, s.is_booked,
                    EXISTS(SELECT 1 FROM bookings b WHERE b.seat_id = s.id AND b.showtime_id = $2) AS booked_for_showtime
             FROM seats s
             WHERE s.screen_id = $1
             ORDER BY s.seat_number",
        )
        .bind(showtime.screen_id)
        .bind(showtime.id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| (Seat::from(row.seat), row.booked_for_showtime))
            .collect())
    }
}
