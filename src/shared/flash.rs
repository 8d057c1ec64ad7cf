//! One-shot user-facing messages shown on the next rendered page.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::{context, Value};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::core::error::Result;
use crate::shared::constants::FLASH_COOKIE;
use crate::shared::cookies::{append_cookie, build_cookie, get_cookie, removal_cookie};
use crate::shared::templates::render_template;

const FLASH_MAX_AGE_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Danger, message)
    }
}

/// Flash messages left by the previous response
#[derive(Debug, Clone, Default)]
pub struct Flashes(pub Vec<Flash>);

impl Flashes {
    pub fn with(mut self, flash: Flash) -> Self {
        self.0.push(flash);
        self
    }
}

impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let flashes = get_cookie(&parts.headers, FLASH_COOKIE)
            .map(|raw| decode(&raw))
            .unwrap_or_default();
        Ok(Flashes(flashes))
    }
}

fn encode(flashes: &[Flash]) -> String {
    serde_json::to_string(flashes).unwrap_or_else(|_| "[]".to_string())
}

fn decode(raw: &str) -> Vec<Flash> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Redirect (303) and carry flash messages to the next page
pub fn redirect_with_flashes(to: &str, flashes: Vec<Flash>) -> Response {
    let mut response = Redirect::to(to).into_response();
    if !flashes.is_empty() {
        append_cookie(
            &mut response,
            &build_cookie(FLASH_COOKIE, encode(&flashes), FLASH_MAX_AGE_SECS, false),
        );
    }
    response
}

/// Redirect (303) with a single flash message
pub fn redirect_with_flash(to: &str, flash: Flash) -> Response {
    redirect_with_flashes(to, vec![flash])
}

/// Render a page template, consuming the given flashes.
///
/// `ctx` is merged with a `flashes` variable; the flash cookie is cleared.
pub fn render_page(
    status: StatusCode,
    template: &str,
    flashes: Flashes,
    ctx: Value,
) -> Result<Response> {
    let body = render_template(template, context! { flashes => flashes.0, ..ctx })?;

    let mut response = (status, Html(body)).into_response();
    append_cookie(&mut response, &removal_cookie(FLASH_COOKIE));
    Ok(response)
}
