//! Local accounts: registration with email confirmation, login sessions and
//! username selection.

pub mod dtos;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod services;

pub use model::AuthenticatedUser;
pub use routes::routes;
pub use services::{AuthService, TokenService};
