pub mod config;
pub mod controllers;
pub mod database;
pub mod discount;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pricing;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::AuthService;
use crate::store::Store;

// Shared state for the whole application
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub config: config::Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: config::Config) -> Arc<Self> {
        let auth = AuthService::new(&config.jwt.secret, config.jwt.expires_in_minutes, config.auth.bcrypt_cost);
        Arc::new(Self { store, auth, config })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
