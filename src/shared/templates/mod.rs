//! Template management for HTML pages, confirmation emails and LLM prompts.
//!
//! Templates live in `templates/` and use Jinja2 syntax.

pub mod engine;

pub use engine::{render_template, TemplateError};

use minijinja::context;

/// Render the assistant persona instruction sent ahead of every conversation.
pub fn render_assistant_system_prompt(
    username: &str,
    max_chars: usize,
) -> Result<String, TemplateError> {
    render_template(
        "prompts/assistant_system.jinja",
        context! { username => username, max_chars => max_chars },
    )
    .map(|s| s.trim().to_string())
}

/// Render the instruction used to title a chat.
pub fn render_chat_title_prompt() -> Result<String, TemplateError> {
    render_template("prompts/chat_title.jinja", context! {}).map(|s| s.trim().to_string())
}

/// Rendered confirmation email bodies
pub struct ConfirmationEmail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Render the plain-text and HTML bodies of the account confirmation email.
pub fn render_confirmation_email(
    email: &str,
    confirm_url: &str,
) -> Result<ConfirmationEmail, TemplateError> {
    let ctx = context! { email => email, confirm_url => confirm_url };

    Ok(ConfirmationEmail {
        subject: "Confirm Your Mirai Account".to_string(),
        text_body: render_template("emails/confirm_email.txt.jinja", ctx.clone())?,
        html_body: render_template("emails/confirm_email.html.jinja", ctx)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_user_and_limit() {
        let prompt = render_assistant_system_prompt("neo", 500).unwrap();
        assert!(prompt.starts_with("You are Mirai, assistant for neo."));
        assert!(prompt.contains("max 500 characters"));
    }

    #[test]
    fn test_confirmation_email_contains_link() {
        let email =
            render_confirmation_email("a@gmail.com", "http://localhost/confirm/abc").unwrap();
        assert!(email.text_body.contains("http://localhost/confirm/abc"));
        assert!(email.text_body.contains("expire in 1 hour"));
        assert!(email.html_body.contains("href=\"http://localhost/confirm/abc\""));
    }
}
