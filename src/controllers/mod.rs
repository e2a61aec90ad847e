pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod cinemas;
pub mod films;
pub mod reports;

use axum::{extract::FromRequest, Json, Router};
use chrono::NaiveDateTime;
use std::sync::Arc;

use crate::error::AppError;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(catalog::routes())
        .merge(films::routes())
        .merge(cinemas::routes())
        .merge(bookings::routes())
        .merge(reports::routes())
}

/// Wall-clock time in the cinema's local zone, as stored in the database.
pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// `Json` whose rejections (bad syntax, wrong content type, missing fields)
/// come back as a validation error in the usual error body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub(crate) struct JsonBody<T>(pub T);
