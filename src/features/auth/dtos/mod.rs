mod auth_dto;

pub use auth_dto::{LoginForm, RegisterForm, UsernameForm};
