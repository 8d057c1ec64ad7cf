//! Template engine for pages, emails and prompts using Jinja2 syntax.
//!
//! Templates are compiled into the binary and registered once on first use.

use minijinja::{AutoEscape, Environment, Value};
use std::sync::OnceLock;
use thiserror::Error;

/// Global template environment (read-only after initialization)
static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// Embedded templates, keyed by their path relative to `templates/`
const TEMPLATES: &[(&str, &str)] = &[
    (
        "pages/base.jinja",
        include_str!("../../../templates/pages/base.jinja"),
    ),
    (
        "pages/index.jinja",
        include_str!("../../../templates/pages/index.jinja"),
    ),
    (
        "pages/register.jinja",
        include_str!("../../../templates/pages/register.jinja"),
    ),
    (
        "pages/login.jinja",
        include_str!("../../../templates/pages/login.jinja"),
    ),
    (
        "pages/set_username.jinja",
        include_str!("../../../templates/pages/set_username.jinja"),
    ),
    (
        "pages/chat.jinja",
        include_str!("../../../templates/pages/chat.jinja"),
    ),
    (
        "emails/confirm_email.txt.jinja",
        include_str!("../../../templates/emails/confirm_email.txt.jinja"),
    ),
    (
        "emails/confirm_email.html.jinja",
        include_str!("../../../templates/emails/confirm_email.html.jinja"),
    ),
    (
        "prompts/assistant_system.jinja",
        include_str!("../../../templates/prompts/assistant_system.jinja"),
    ),
    (
        "prompts/chat_title.jinja",
        include_str!("../../../templates/prompts/chat_title.jinja"),
    ),
];

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn auto_escape_for(name: &str) -> AutoEscape {
    if name.starts_with("pages/") || name.contains(".html") {
        AutoEscape::Html
    } else {
        AutoEscape::None
    }
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(auto_escape_for);
    env.set_trim_blocks(true);

    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        } else {
            tracing::debug!("Loaded template: {}", name);
        }
    }

    env
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a template with the given context.
///
/// # Example
/// ```ignore
/// let html = render_template("pages/login.jinja", minijinja::context! { flashes => flashes })?;
/// ```
pub fn render_template(template_name: &str, ctx: Value) -> Result<String, TemplateError> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

    template
        .render(ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}

/// Check if a template exists
#[cfg(test)]
pub fn template_exists(template_name: &str) -> bool {
    get_environment().get_template(template_name).is_ok()
}
