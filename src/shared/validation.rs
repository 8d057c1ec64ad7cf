use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationErrors;

lazy_static! {
    /// Registration is limited to Gmail addresses
    /// - Valid: "john.doe@gmail.com", "a+b@gmail.com"
    /// - Invalid: "john@yahoo.com", "john@gmail.co", "@gmail.com"
    pub static ref GMAIL_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@gmail\.com$").unwrap();

    /// Usernames are letters, digits and underscores only
    /// - Valid: "john_doe", "user123", "_admin"
    /// - Invalid: "user-name", "user name", "júlia"
    pub static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
}

/// Flatten validation errors into user-facing messages, ordered by field name
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}.", field))
            })
        })
        .collect()
}
