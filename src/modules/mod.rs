//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for disk storage, attachment text extraction and mail delivery.

pub mod extraction;
pub mod mail;
pub mod storage;
