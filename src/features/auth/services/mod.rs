mod auth_service;
mod token_service;

pub use auth_service::{AuthService, ConfirmOutcome, LoginOutcome, RegisterOutcome};
pub use token_service::TokenService;
