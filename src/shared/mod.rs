//! Shared layer - helpers used across features

pub mod constants;
pub mod cookies;
pub mod flash;
pub mod llm;
pub mod templates;
#[cfg(test)]
pub mod test_helpers;
pub mod text;
pub mod types;
pub mod validation;
