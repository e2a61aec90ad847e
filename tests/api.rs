mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinema_booking::models::Role;

use common::{customer, seed_cinema, seed_showtime, TestApp, PASSWORD};

async fn app_with_showtime() -> (TestApp, i64) {
    let app = TestApp::new();
    let cinema = seed_cinema(app.store(), "Bristol").await;
    let show_time = Local::now().naive_local() + Duration::days(2);
    let show = seed_showtime(app.store(), cinema, show_time).await;
    (app, show.id)
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_sets_the_token_cookie() {
    let app = TestApp::new();
    app.user("Clerk", Role::BookingStaff).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "username": "clerk", "password": PASSWORD }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("access_token_cookie="));
    assert!(cookie.contains("HttpOnly"));

    let token_pair = cookie.split(';').next().unwrap().to_string();
    let me = Request::builder()
        .uri("/api/me")
        .header(header::COOKIE, token_pair)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(me).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.user("clerk", Role::BookingStaff).await;
    let (status, body) = app
        .send("POST", "/api/login", None, Some(json!({ "username": "clerk", "password": "Wrong1!x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn booking_requires_a_token() {
    let (app, showtime_id) = app_with_showtime().await;
    let (status, _) = app
        .send("POST", "/api/bookings", None, Some(json!({ "showtime_id": showtime_id, "seat_ids": [1] })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_lookup_and_cancellation_over_http() {
    let (app, showtime_id) = app_with_showtime().await;
    let token = app.user("clerk", Role::BookingStaff).await;
    let who = customer();

    let (status, booked) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&token),
            Some(json!({
                "showtime_id": showtime_id.to_string(),
                "customer_name": who.name,
                "customer_email": who.email,
                "customer_phone": who.phone,
                "seat_ids": "31, 32",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{booked}");
    let reference = booked["booking_reference"].as_str().unwrap().to_string();
    assert_eq!(reference.len(), 8);
    let total = booked["total_price"].as_f64().unwrap();

    let (status, receipt) = app.send("GET", &format!("/api/bookings/{reference}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["seat_numbers"], json!([31, 32]));
    assert_eq!(receipt["total_price"].as_f64().unwrap(), total);
    assert_eq!(receipt["staff_name"], "clerk");

    let (status, found) = app
        .send("GET", &format!("/api/bookings?query={}", who.email), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, cancelled) = app
        .send("POST", "/api/bookings/cancel", Some(&token), Some(json!({ "booking_reference": reference })))
        .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    let refund = cancelled["refund_amount"].as_f64().unwrap();
    assert!((refund - (total * 0.5 * 100.0).round() / 100.0).abs() < 1e-9);

    let (status, _) = app.send("GET", &format!("/api/bookings/{reference}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn double_booking_is_a_bad_request() {
    let (app, showtime_id) = app_with_showtime().await;
    let token = app.user("clerk", Role::BookingStaff).await;
    let body = |who: cinema_booking::models::Customer| {
        json!({
            "showtime_id": showtime_id,
            "customer_name": who.name,
            "customer_email": who.email,
            "customer_phone": who.phone,
            "seat_ids": [12],
        })
    };

    let (status, _) = app.send("POST", "/api/bookings", Some(&token), Some(body(customer()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, error) = app.send("POST", "/api/bookings", Some(&token), Some(body(customer()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["message"], "One or more selected seats are already booked");
}

#[tokio::test]
async fn missing_booking_fields_are_reported() {
    let (app, showtime_id) = app_with_showtime().await;
    let token = app.user("clerk", Role::BookingStaff).await;
    let (status, error) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&token),
            Some(json!({ "showtime_id": showtime_id, "customer_name": "Ann", "seat_ids": [1] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["message"], "Missing required fields");
}

#[tokio::test]
async fn malformed_booking_body_uses_the_error_envelope() {
    let (app, _) = app_with_showtime().await;
    let token = app.user("clerk", Role::BookingStaff).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"showtime_id": 1, "seat_ids": [1,"#))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["success"], false);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn booking_an_unknown_showtime_is_not_found() {
    let (app, _) = app_with_showtime().await;
    let token = app.user("clerk", Role::BookingStaff).await;
    let who = customer();
    let (status, error) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&token),
            Some(json!({
                "showtime_id": 9999,
                "customer_name": who.name,
                "customer_email": who.email,
                "customer_phone": who.phone,
                "seat_ids": [1],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");
    assert_eq!(error["message"], "Invalid showtime ID");
}

#[tokio::test]
async fn reports_are_for_managers() {
    let app = TestApp::new();
    let clerk = app.user("clerk", Role::BookingStaff).await;
    let manager = app.user("boss", Role::Manager).await;

    let (status, _) = app.send("GET", "/api/reports/city-summary", Some(&clerk), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    seed_cinema(app.store(), "Cardiff").await;
    let (status, report) = app.send("GET", "/api/reports/city-summary", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["title"], "Bookings by City");
    assert_eq!(report["columns"][2]["format"], "currency");
    assert_eq!(report["rows"][0]["city"], "Cardiff");
    assert_eq!(report["rows"][0]["total_bookings"], 0);
}

#[tokio::test]
async fn only_admins_create_users_with_strong_passwords() {
    let app = TestApp::new();
    let admin = app.user("root", Role::Admin).await;
    let manager = app.user("boss", Role::Manager).await;
    let new_user = |password: &str| json!({ "username": "newbie", "password": password, "role": "booking_staff" });

    let (status, _) = app.send("POST", "/api/users", Some(&manager), Some(new_user("Secret1!"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("POST", "/api/users", Some(&admin), Some(new_user("password"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app.send("POST", "/api/users", Some(&admin), Some(new_user("Secret1!"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "booking_staff");
    assert!(created.get("password_hash").is_none());

    let (status, _) = app.send("POST", "/api/users", Some(&admin), Some(new_user("Secret1!"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn managers_build_cinemas_within_screen_limits() {
    let app = TestApp::new();
    let manager = app.user("boss", Role::Manager).await;

    let too_small = json!({ "city": "Bath", "location": "Abbey", "screens": [{ "total_seats": 40 }] });
    let (status, _) = app.send("POST", "/api/cinemas", Some(&manager), Some(too_small)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let cinema = json!({
        "city": "Bath",
        "location": "Abbey",
        "screens": [{ "total_seats": 50, "vip_count": 5 }, { "total_seats": 120 }],
    });
    let (status, created) = app.send("POST", "/api/cinemas", Some(&manager), Some(cinema)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["num_of_screens"], 2);

    let id = created["id"].as_i64().unwrap();
    let (status, screens) = app.send("GET", &format!("/api/cinemas/{id}/screens"), Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(screens[1]["total_seats"], 120);

    let (status, screen) = app
        .send("POST", &format!("/api/cinemas/{id}/screens"), Some(&manager), Some(json!({ "total_seats": 80 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(screen["screen_number"], 3);
}

#[tokio::test]
async fn seat_map_prices_each_category() {
    let (app, showtime_id) = app_with_showtime().await;
    let token = app.user("clerk", Role::BookingStaff).await;

    let (status, map) = app
        .send("GET", &format!("/api/showtimes/{showtime_id}/seats"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let seats = map["seats"].as_array().unwrap();
    assert_eq!(seats.len(), 100);
    assert_eq!(seats[0]["seat_type"], "Lower Hall");
    assert_eq!(seats[99]["seat_type"], "VIP");
    assert_eq!(map["discount_eligible"], false);
}
