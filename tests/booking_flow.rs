mod common;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;

use cinema_booking::error::AppError;
use cinema_booking::services::booking::{cancel_booking, create_booking, BookingRequest, CancelTarget};
use cinema_booking::services::catalog::seat_map;
use cinema_booking::store::{BookingStore, CatalogStore, MemoryStore, Store};

use common::{add_showtime, customer, seed_cinema, seed_showtime};

const STAFF_ID: i64 = 1;

fn evening() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 10)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap()
}

fn request(showtime_id: i64, seat_ids: Vec<i64>) -> BookingRequest {
    BookingRequest { showtime_id, customer: customer(), seat_ids }
}

async fn booked_seat_ids(store: &dyn Store, showtime_id: i64) -> Vec<i64> {
    seat_map(store, showtime_id, evening() - Duration::days(3))
        .await
        .unwrap()
        .seats
        .into_iter()
        .filter(|s| s.is_booked)
        .map(|s| s.id)
        .collect()
}

#[tokio::test]
async fn london_vip_pair_two_days_out() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "London").await;
    let show = seed_showtime(&store, cinema, evening()).await;

    let confirmation = create_booking(&store, request(show.id, vec![91, 92]), STAFF_ID, evening() - Duration::days(2))
        .await
        .unwrap();

    assert!(!confirmation.discounts.last_minute);
    assert!(!confirmation.discounts.family);
    assert!(confirmation.seats.iter().all(|s| s.price == 17.28));
    assert_eq!(confirmation.total_price, 34.56);
    assert_eq!(confirmation.booking_reference.len(), 8);
}

#[tokio::test]
async fn stored_seat_prices_add_up_to_the_quoted_total() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Cardiff").await;
    let show = seed_showtime(&store, cinema, evening()).await;

    let confirmation = create_booking(&store, request(show.id, vec![5, 40, 95]), STAFF_ID, evening() - Duration::minutes(15))
        .await
        .unwrap();
    assert!(confirmation.discounts.last_minute);

    let group = store
        .booking_group(&confirmation.booking_reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.seats.len(), 3);
    assert_eq!(group.total_price(), confirmation.total_price);
    assert_eq!(group.seat_numbers(), vec![5, 40, 95]);
}

#[tokio::test]
async fn family_of_four_in_bristol() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Bristol").await;
    let show = seed_showtime(&store, cinema, evening()).await;

    let confirmation = create_booking(&store, request(show.id, vec![1, 2, 3, 4]), STAFF_ID, evening() - Duration::days(1))
        .await
        .unwrap();

    assert!(confirmation.discounts.family);
    assert!(confirmation.seats.iter().all(|s| s.price == 6.4));
    assert_eq!(confirmation.total_price, 25.6);
}

#[tokio::test]
async fn family_of_four_vip_in_london_then_refunded() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "London").await;
    let show = seed_showtime(&store, cinema, evening()).await;

    let confirmation = create_booking(&store, request(show.id, vec![91, 92, 93, 94]), STAFF_ID, evening() - Duration::days(3))
        .await
        .unwrap();
    assert!(confirmation.discounts.family);
    assert_eq!(confirmation.total_price, 55.3);

    let group = store
        .booking_group(&confirmation.booking_reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.total_price(), 55.3);

    let cancellation = cancel_booking(
        &store,
        CancelTarget::Reference(confirmation.booking_reference),
        evening() - Duration::days(2),
    )
    .await
    .unwrap();
    assert_eq!(cancellation.refund_amount, 27.65);
}

#[tokio::test]
async fn booking_window_is_seven_days_inclusive() {
    // Showtimes at 7 days minus a second, exactly 7 days and 7 days plus a second.
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Leeds").await;
    let now = evening() - Duration::days(7);
    let at_limit = seed_showtime(&store, cinema, evening()).await;
    let beyond = add_showtime(&store, at_limit.film_id, cinema, evening() + Duration::seconds(1)).await;

    let inside = add_showtime(&store, at_limit.film_id, cinema, evening() - Duration::seconds(1)).await;

    assert!(create_booking(&store, request(inside.id, vec![1]), STAFF_ID, now).await.is_ok());
    assert!(create_booking(&store, request(at_limit.id, vec![1]), STAFF_ID, now).await.is_ok());
    let err = create_booking(&store, request(beyond.id, vec![1]), STAFF_ID, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Policy(_)));
    assert!(booked_seat_ids(&store, beyond.id).await.is_empty());
}

#[tokio::test]
async fn past_showtimes_are_rejected() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Leeds").await;
    let show = seed_showtime(&store, cinema, evening()).await;

    let err = create_booking(&store, request(show.id, vec![1]), STAFF_ID, evening() + Duration::minutes(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Policy(_)));
}

#[tokio::test]
async fn unknown_showtime_is_not_found() {
    let store = MemoryStore::new();
    let err = create_booking(&store, request(404, vec![1]), STAFF_ID, evening())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(msg) if msg == "Invalid showtime ID"));
}

#[tokio::test]
async fn one_taken_seat_fails_the_whole_request() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Bristol").await;
    let show = seed_showtime(&store, cinema, evening()).await;
    let now = evening() - Duration::days(3);

    create_booking(&store, request(show.id, vec![10]), STAFF_ID, now).await.unwrap();
    let err = create_booking(&store, request(show.id, vec![11, 10, 12]), STAFF_ID, now)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(booked_seat_ids(&store, show.id).await, vec![10]);
}

#[tokio::test]
async fn same_seat_can_be_booked_for_different_showtimes() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Bristol").await;
    let first = seed_showtime(&store, cinema, evening()).await;
    let second = add_showtime(&store, first.film_id, cinema, evening() + Duration::hours(3)).await;
    let now = evening() - Duration::days(3);

    create_booking(&store, request(first.id, vec![7]), STAFF_ID, now).await.unwrap();
    create_booking(&store, request(second.id, vec![7]), STAFF_ID, now).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_seat_produce_one_booking() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let cinema = seed_cinema(store.as_ref(), "London").await;
    let show = seed_showtime(store.as_ref(), cinema, evening()).await;
    let now = evening() - Duration::days(2);
    let showtime_id = show.id;

    let attempts = (0..2).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { create_booking(store.as_ref(), request(showtime_id, vec![50]), STAFF_ID, now).await })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count(),
        1
    );
    assert_eq!(booked_seat_ids(store.as_ref(), show.id).await, vec![50]);
}

#[tokio::test]
async fn cancelling_two_days_out_refunds_half_and_frees_the_seats() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "London").await;
    let show = seed_showtime(&store, cinema, evening()).await;

    let confirmation = create_booking(&store, request(show.id, vec![91, 92]), STAFF_ID, evening() - Duration::days(3))
        .await
        .unwrap();
    let cancellation = cancel_booking(
        &store,
        CancelTarget::Reference(confirmation.booking_reference.clone()),
        evening() - Duration::days(2),
    )
    .await
    .unwrap();

    assert_eq!(cancellation.refund_amount, 17.28);
    assert_eq!(cancellation.booking_reference, confirmation.booking_reference);
    assert!(booked_seat_ids(&store, show.id).await.is_empty());
    let seats = store.seat_map(&show).await.unwrap();
    assert!(seats.iter().all(|(seat, _)| !seat.is_booked));

    // The freed seats can be sold again.
    create_booking(&store, request(show.id, vec![91, 92]), STAFF_ID, evening() - Duration::days(2))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancellation_cutoff_is_twenty_four_hours() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Cardiff").await;
    let show = seed_showtime(&store, cinema, evening()).await;
    let confirmation = create_booking(&store, request(show.id, vec![1]), STAFF_ID, evening() - Duration::days(5))
        .await
        .unwrap();
    let target = CancelTarget::Reference(confirmation.booking_reference.clone());

    let err = cancel_booking(&store, target.clone(), evening() - Duration::hours(24))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Policy(_)));
    assert_eq!(booked_seat_ids(&store, show.id).await, vec![1]);

    cancel_booking(&store, target, evening() - Duration::hours(24) - Duration::seconds(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancel_by_row_id_and_only_once() {
    let store = MemoryStore::new();
    let cinema = seed_cinema(&store, "Cardiff").await;
    let show = seed_showtime(&store, cinema, evening()).await;
    let now = evening() - Duration::days(4);
    create_booking(&store, request(show.id, vec![1, 2, 3]), STAFF_ID, now).await.unwrap();

    // Row 2 belongs to the same group as rows 1 and 3.
    let cancellation = cancel_booking(&store, CancelTarget::BookingId(2), now).await.unwrap();
    assert_eq!(cancellation.booking_id, 1);
    assert!(booked_seat_ids(&store, show.id).await.is_empty());

    let again = cancel_booking(&store, CancelTarget::BookingId(2), now).await.unwrap_err();
    assert!(matches!(again, AppError::NotFound(_)));
}
