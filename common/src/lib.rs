//! Shared utilities for mongo-init components
//!
//! This crate provides common functionality used by the bootstrap tooling:
//! - Structured logging initialization
//! - Environment variable parsing helpers

pub mod config;
pub mod logging;

pub use config::ConfigExt;
pub use logging::init_logging;
