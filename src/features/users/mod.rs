//! User accounts.
//!
//! Persistence for the `users` table. Registration, confirmation and login
//! flows live in the `auth` feature.

pub mod models;
pub mod services;

pub use models::User;
pub use services::UserService;
