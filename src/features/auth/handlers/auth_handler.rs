use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Form,
};
use minijinja::context;
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{LoginForm, RegisterForm, UsernameForm};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::services::{AuthService, ConfirmOutcome, LoginOutcome, RegisterOutcome};
use crate::shared::constants::SESSION_COOKIE;
use crate::shared::cookies::{append_cookie, removal_cookie};
use crate::shared::flash::{
    redirect_with_flash, redirect_with_flashes, render_page, Flash, Flashes,
};
use crate::shared::validation::validation_messages;

fn with_errors(flashes: Flashes, errors: Vec<String>) -> Flashes {
    errors
        .into_iter()
        .fold(flashes, |flashes, message| flashes.with(Flash::danger(message)))
}

/// Redirect and start a session for `user_id`
fn redirect_logged_in(
    service: &AuthService,
    user_id: i64,
    to: &str,
    flash: Flash,
) -> Result<Response> {
    let mut response = redirect_with_flash(to, flash);
    append_cookie(&mut response, &service.session_cookie(user_id)?);
    Ok(response)
}

/// Landing page
pub async fn index(flashes: Flashes) -> Result<Response> {
    render_page(StatusCode::OK, "pages/index.jinja", flashes, context! {})
}

pub async fn register_page(flashes: Flashes) -> Result<Response> {
    render_page(
        StatusCode::OK,
        "pages/register.jinja",
        flashes,
        context! { email => "" },
    )
}

/// Create an account and send the confirmation email
pub async fn register(
    State(service): State<Arc<AuthService>>,
    flashes: Flashes,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let mut errors = form
        .validate()
        .err()
        .map(|e| validation_messages(&e))
        .unwrap_or_default();
    if !form.passwords_match() {
        errors.push("Passwords must match.".to_string());
    }

    if !errors.is_empty() {
        return render_page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "pages/register.jinja",
            with_errors(flashes, errors),
            context! { email => form.email },
        );
    }

    match service.register(&form.email, &form.password).await? {
        RegisterOutcome::EmailTaken => Ok(redirect_with_flash(
            "/register",
            Flash::danger("⚠️ Email already registered."),
        )),
        RegisterOutcome::Registered { email_sent } => {
            let mut next = Vec::new();
            if !email_sent {
                next.push(Flash::warning("⚠️ Failed to send confirmation email."));
            }
            next.push(Flash::info(
                "✅ Registration successful! Please check your Gmail to confirm before login.",
            ));
            Ok(redirect_with_flashes("/login", next))
        }
    }
}

/// Confirm an account from the emailed link and log the user in
pub async fn confirm_email(
    State(service): State<Arc<AuthService>>,
    Path(token): Path<String>,
) -> Result<Response> {
    match service.confirm_email(&token).await? {
        ConfirmOutcome::Confirmed(user) => redirect_logged_in(
            &service,
            user.id,
            "/set-username",
            Flash::success("✅ Email confirmed! Please set your username."),
        ),
        ConfirmOutcome::AlreadyConfirmed => Ok(redirect_with_flash(
            "/login",
            Flash::info("ℹ️ Account already confirmed. Please login."),
        )),
        ConfirmOutcome::InvalidOrExpired => Ok(redirect_with_flash(
            "/login",
            Flash::danger("⚠️ Confirmation link invalid or expired."),
        )),
    }
}

/// Alternate verification link carrying the user id
pub async fn verify_email(
    State(service): State<Arc<AuthService>>,
    Path(token): Path<String>,
) -> Result<Response> {
    match service.verify_account(&token).await? {
        Some(user) => redirect_logged_in(
            &service,
            user.id,
            "/set-username",
            Flash::success("✅ Email verified! Now set your username."),
        ),
        None => Ok(redirect_with_flash(
            "/login",
            Flash::danger("❌ Invalid or expired verification link."),
        )),
    }
}

pub async fn login_page(flashes: Flashes) -> Result<Response> {
    render_page(
        StatusCode::OK,
        "pages/login.jinja",
        flashes,
        context! { email => "" },
    )
}

/// Check credentials and start a session
pub async fn login(
    State(service): State<Arc<AuthService>>,
    flashes: Flashes,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    if let Err(e) = form.validate() {
        return render_page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "pages/login.jinja",
            with_errors(flashes, validation_messages(&e)),
            context! { email => form.email },
        );
    }

    let (status, flash) = match service.login(&form.email, &form.password).await? {
        LoginOutcome::Success(user) => {
            let to = if user.username.is_some() {
                "/chat"
            } else {
                "/set-username"
            };
            let greeting = format!("✅ Welcome back, {}!", user.display_name());
            return redirect_logged_in(&service, user.id, to, Flash::success(greeting));
        }
        LoginOutcome::UnknownEmail => (
            StatusCode::UNAUTHORIZED,
            Flash::danger("⚠️ No account with this email."),
        ),
        LoginOutcome::Unconfirmed => (
            StatusCode::FORBIDDEN,
            Flash::warning("⚠️ Please confirm your email before logging in."),
        ),
        LoginOutcome::IncorrectPassword => (
            StatusCode::UNAUTHORIZED,
            Flash::danger("❌ Incorrect password."),
        ),
    };

    render_page(
        status,
        "pages/login.jinja",
        flashes.with(flash),
        context! { email => form.email },
    )
}

pub async fn logout() -> Response {
    let mut response = redirect_with_flash("/login", Flash::info("You've been logged out."));
    append_cookie(&mut response, &removal_cookie(SESSION_COOKIE));
    response
}

pub async fn set_username_page(user: AuthenticatedUser, flashes: Flashes) -> Result<Response> {
    render_page(
        StatusCode::OK,
        "pages/set_username.jinja",
        flashes,
        context! { username => user.username.unwrap_or_default() },
    )
}

pub async fn set_username(
    user: AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
    flashes: Flashes,
    Form(form): Form<UsernameForm>,
) -> Result<Response> {
    if let Err(e) = form.validate() {
        return render_page(
            StatusCode::UNPROCESSABLE_ENTITY,
            "pages/set_username.jinja",
            with_errors(flashes, validation_messages(&e)),
            context! { username => form.username },
        );
    }

    match service.set_username(user.id, &form.username).await {
        Ok(()) => Ok(redirect_with_flash(
            "/chat",
            Flash::success("✅ Username set successfully!"),
        )),
        Err(AppError::Conflict(_)) => Ok(redirect_with_flash(
            "/set-username",
            Flash::danger("⚠️ Username already taken."),
        )),
        Err(e) => Err(e),
    }
}
