use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};

const PURPOSE_SESSION: &str = "session";
const PURPOSE_EMAIL_CONFIRM: &str = "email-confirm";
const PURPOSE_VERIFY: &str = "verify";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token invalid")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id for session/verify tokens, email address for confirmation tokens
    sub: String,
    purpose: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks the HS256 tokens used for sessions and account confirmation
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_secs: i64,
    confirm_ttl_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            session_ttl_secs: config.session_ttl.as_secs() as i64,
            confirm_ttl_secs: config.confirm_token_ttl.as_secs() as i64,
        }
    }

    pub fn session_ttl_secs(&self) -> u64 {
        self.session_ttl_secs as u64
    }

    fn issue(&self, sub: String, purpose: &str, issued_at: i64, ttl_secs: i64) -> Result<String> {
        let claims = Claims {
            sub,
            purpose: purpose.to_string(),
            iat: issued_at,
            exp: issued_at + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    fn verify(&self, token: &str, purpose: &str) -> std::result::Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?
            .claims;

        if claims.purpose != purpose {
            return Err(TokenError::Invalid);
        }
        Ok(claims.sub)
    }

    pub fn issue_session(&self, user_id: i64) -> Result<String> {
        self.issue(
            user_id.to_string(),
            PURPOSE_SESSION,
            Utc::now().timestamp(),
            self.session_ttl_secs,
        )
    }

    /// User id carried by a valid session token
    pub fn verify_session(&self, token: &str) -> std::result::Result<i64, TokenError> {
        self.verify(token, PURPOSE_SESSION)?
            .parse()
            .map_err(|_| TokenError::Invalid)
    }

    pub fn issue_email_confirmation(&self, email: &str) -> Result<String> {
        self.issue_email_confirmation_at(email, Utc::now().timestamp())
    }

    /// Confirmation token as if issued at `issued_at` (unix seconds)
    pub fn issue_email_confirmation_at(&self, email: &str, issued_at: i64) -> Result<String> {
        self.issue(
            email.to_string(),
            PURPOSE_EMAIL_CONFIRM,
            issued_at,
            self.confirm_ttl_secs,
        )
    }

    /// Email address carried by a valid confirmation token
    pub fn verify_email_confirmation(&self, token: &str) -> std::result::Result<String, TokenError> {
        self.verify(token, PURPOSE_EMAIL_CONFIRM)
    }

    /// The app never mails `/verify` links; these tokens are minted only in tests
    #[cfg(test)]
    pub fn issue_verification(&self, user_id: i64) -> Result<String> {
        self.issue(
            user_id.to_string(),
            PURPOSE_VERIFY,
            Utc::now().timestamp(),
            self.confirm_ttl_secs,
        )
    }

    pub fn verify_verification(&self, token: &str) -> std::result::Result<i64, TokenError> {
        self.verify(token, PURPOSE_VERIFY)?
            .parse()
            .map_err(|_| TokenError::Invalid)
    }
}
