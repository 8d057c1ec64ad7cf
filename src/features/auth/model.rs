use serde::Serialize;

use crate::features::users::User;

/// The logged-in user, resolved from the session cookie on every request
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
        }
    }
}

impl AuthenticatedUser {
    /// Name used by the assistant persona
    pub fn persona_name(&self) -> &str {
        self.username.as_deref().unwrap_or("User")
    }
}
