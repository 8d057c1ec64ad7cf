use axum_extra::extract::cookie::Cookie;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::error::{AppError, Result};
use crate::features::auth::services::token_service::TokenService;
use crate::features::users::{User, UserService};
use crate::modules::mail::{Mailer, OutgoingEmail};
use crate::shared::constants::SESSION_COOKIE;
use crate::shared::cookies::build_cookie;
use crate::shared::templates::render_confirmation_email;

#[derive(Debug)]
pub enum RegisterOutcome {
    Registered { email_sent: bool },
    EmailTaken,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed(User),
    AlreadyConfirmed,
    InvalidOrExpired,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Success(User),
    UnknownEmail,
    Unconfirmed,
    IncorrectPassword,
}

/// Registration, confirmation, login and username selection
pub struct AuthService {
    users: Arc<UserService>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
    bcrypt_cost: u32,
    secure_cookies: bool,
}

impl AuthService {
    pub fn new(
        users: Arc<UserService>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        public_base_url: String,
        bcrypt_cost: u32,
        secure_cookies: bool,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            public_base_url,
            bcrypt_cost,
            secure_cookies,
        }
    }

    /// Create an unconfirmed account and mail its confirmation link
    pub async fn register(&self, email: &str, password: &str) -> Result<RegisterOutcome> {
        if self.users.find_by_email(email).await?.is_some() {
            return Ok(RegisterOutcome::EmailTaken);
        }

        let password_hash = hash_password(password.to_string(), self.bcrypt_cost).await?;
        let user = match self.users.create(email, &password_hash).await {
            Ok(user) => user,
            Err(AppError::Conflict(_)) => return Ok(RegisterOutcome::EmailTaken),
            Err(e) => return Err(e),
        };

        let email_sent = self.send_confirmation_email(&user).await;
        Ok(RegisterOutcome::Registered { email_sent })
    }

    /// Returns whether the mail was handed off; failures are logged only
    async fn send_confirmation_email(&self, user: &User) -> bool {
        let token = match self.tokens.issue_email_confirmation(&user.email) {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not issue confirmation token: {}", e);
                return false;
            }
        };
        let confirm_url = format!("{}/confirm/{}", self.public_base_url, token);

        let rendered = match render_confirmation_email(&user.email, &confirm_url) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Could not render confirmation email: {}", e);
                return false;
            }
        };

        let email = OutgoingEmail {
            to: user.email.clone(),
            subject: rendered.subject,
            text_body: rendered.text_body,
            html_body: rendered.html_body,
        };

        match self.mailer.send(email).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send confirmation email to {}: {}", user.email, e);
                false
            }
        }
    }

    /// Confirm the account named by an emailed token
    pub async fn confirm_email(&self, token: &str) -> Result<ConfirmOutcome> {
        let email = match self.tokens.verify_email_confirmation(token) {
            Ok(email) => email,
            Err(e) => {
                debug!("Rejected confirmation token: {}", e);
                return Ok(ConfirmOutcome::InvalidOrExpired);
            }
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Ok(ConfirmOutcome::InvalidOrExpired);
        };

        if user.is_confirmed {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }

        self.users.mark_confirmed(user.id).await?;
        Ok(ConfirmOutcome::Confirmed(User {
            is_confirmed: true,
            ..user
        }))
    }

    /// Confirm via a user-id verification token. `None` when the token is
    /// invalid, expired, or names no user.
    pub async fn verify_account(&self, token: &str) -> Result<Option<User>> {
        let user_id = match self.tokens.verify_verification(token) {
            Ok(id) => id,
            Err(e) => {
                debug!("Rejected verification token: {}", e);
                return Ok(None);
            }
        };

        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(None);
        };

        if !user.is_confirmed {
            self.users.mark_confirmed(user.id).await?;
        }
        Ok(Some(User {
            is_confirmed: true,
            ..user
        }))
    }

    /// Check credentials. There is no lockout: every wrong password gets
    /// the same answer.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(LoginOutcome::UnknownEmail);
        };

        if !user.is_confirmed {
            return Ok(LoginOutcome::Unconfirmed);
        }

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            debug!("Incorrect password for user {}", user.id);
            return Ok(LoginOutcome::IncorrectPassword);
        }

        info!("User {} logged in", user.id);
        Ok(LoginOutcome::Success(user))
    }

    pub async fn set_username(&self, user_id: i64, username: &str) -> Result<()> {
        self.users.set_username(user_id, username).await
    }

    /// `Set-Cookie` value starting a session for the user
    pub fn session_cookie(&self, user_id: i64) -> Result<Cookie<'static>> {
        let token = self.tokens.issue_session(user_id)?;
        Ok(build_cookie(
            SESSION_COOKIE,
            token,
            self.tokens.session_ttl_secs(),
            self.secure_cookies,
        ))
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
}
