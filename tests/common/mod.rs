#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDateTime;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use cinema_booking::config::Config;
use cinema_booking::models::{Customer, Role, SeatLayout, ShowtimeDetails};
use cinema_booking::store::{CatalogStore, FilmInput, MemoryStore, NewCinema, NewShowtime, Store, UserStore};
use cinema_booking::AppState;

pub const PASSWORD: &str = "Secret1!";

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "JWT_SECRET" => Some("integration-secret".to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .expect("test configuration")
}

pub fn customer() -> Customer {
    Customer {
        name: Name().fake(),
        email: SafeEmail().fake(),
        phone: PhoneNumber().fake(),
    }
}

/// One cinema with a single 100-seat screen: seats 1-30 Lower Hall,
/// 31-90 Upper Gallery, 91-100 VIP.
pub async fn seed_cinema(store: &dyn Store, city: &str) -> i64 {
    store
        .create_cinema(&NewCinema {
            city: city.to_string(),
            location: "High Street".to_string(),
            screens: vec![SeatLayout::generate(100, 10)],
        })
        .await
        .expect("cinema")
        .id
}

pub async fn seed_showtime(store: &dyn Store, cinema_id: i64, show_time: NaiveDateTime) -> ShowtimeDetails {
    let (_, showtimes) = store
        .create_film(
            &FilmInput {
                title: "The Long Night".to_string(),
                genre: "Drama".to_string(),
                age_rating: "15".to_string(),
                description: None,
            },
            &[NewShowtime { cinema_id, screen_number: 1, show_time, price: 10.0 }],
        )
        .await
        .expect("film");
    store
        .showtime_details(showtimes[0].id)
        .await
        .expect("details")
        .expect("showtime exists")
}

pub async fn add_showtime(store: &dyn Store, film_id: i64, cinema_id: i64, show_time: NaiveDateTime) -> ShowtimeDetails {
    let showtime = store
        .create_showtime(film_id, &NewShowtime { cinema_id, screen_number: 1, show_time, price: 10.0 })
        .await
        .expect("showtime");
    store
        .showtime_details(showtime.id)
        .await
        .expect("details")
        .expect("showtime exists")
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(store, test_config());
        let router = cinema_booking::router(state.clone());
        TestApp { state, router }
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    pub async fn user(&self, username: &str, role: Role) -> String {
        let hash = self.state.auth.hash_password(PASSWORD).await.expect("hash");
        let user = self.store().create_user(username, &hash, role).await.expect("user");
        self.state.auth.issue_token(&user).expect("token")
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
