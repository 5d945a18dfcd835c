//! Data models: configuration, templates, and extraction results.

pub mod config;
pub mod result;
pub mod template;
