//! Core layer - configuration, database, errors and HTTP plumbing

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod extractor;
pub mod middleware;
