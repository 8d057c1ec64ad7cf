use serde::Deserialize;
use validator::Validate;

use crate::shared::validation::{GMAIL_REGEX, USERNAME_REGEX};

/// Registration form
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(
        email(message = "Invalid email address."),
        regex(
            path = *GMAIL_REGEX,
            message = "Only Gmail allowed."
        )
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,

    pub confirm_password: String,
}

impl RegisterForm {
    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }
}

/// Login form
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// Username selection form
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UsernameForm {
    #[validate(
        length(min = 3, max = 20, message = "Username must be 3-20 characters."),
        regex(
            path = *USERNAME_REGEX,
            message = "Letters, numbers, underscores only."
        )
    )]
    pub username: String,
}
