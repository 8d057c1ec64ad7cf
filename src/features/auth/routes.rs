use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::auth::handlers;
use crate::features::auth::services::AuthService;

/// Account pages: landing, registration, confirmation, login and username
pub fn routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/confirm/{token}", get(handlers::confirm_email))
        .route("/verify/{token}", get(handlers::verify_email))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route(
            "/set-username",
            get(handlers::set_username_page).post(handlers::set_username),
        )
        .with_state(service)
}
