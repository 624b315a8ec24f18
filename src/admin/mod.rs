//! Administrative endpoints.
//!
//! Unauthenticated. The relay trusts both of its ends.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use self::handlers::{get_status, request_shutdown};
use crate::http::server::AppState;

pub fn setup_admin_router() -> Router<AppState> {
    Router::new()
        .route("/shutdown", post(request_shutdown))
        .route("/status", get(get_status))
}
