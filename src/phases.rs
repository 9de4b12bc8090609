//! Bootstrap phase implementations.

pub mod upload_config;
