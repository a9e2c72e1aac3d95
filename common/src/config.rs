//! Environment variable parsing helpers
//!
//! Provides ergonomic helpers for reading configuration from environment variables.

use std::env;

/// Extension trait for parsing environment variables.
///
/// Provides convenient methods for reading env vars with defaults, optional
/// overrides and lists.
pub trait ConfigExt {
    /// Get an environment variable with a default value.
    ///
    /// # Example
    /// ```ignore
    /// let format = String::env_or("LOG_FORMAT", "text");
    /// ```
    fn env_or(name: &str, default: &str) -> String {
        env::var(name).unwrap_or_else(|_| default.to_string())
    }

    /// Get an environment variable only if it is set and non-empty.
    ///
    /// Used for layered configuration where an unset variable must leave the
    /// previous value alone.
    fn env_opt(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }

    /// Get a comma-separated environment variable as a list.
    ///
    /// Entries are trimmed and empty entries are dropped. Returns `None` when
    /// the variable is unset or empty.
    ///
    /// # Example
    /// ```ignore
    /// let names = String::env_list("MONGO_COLLECTIONS");
    /// ```
    fn env_list(name: &str) -> Option<Vec<String>> {
        Self::env_opt(name).map(|v| split_list(&v))
    }
}

// Blanket implementation for all types
impl<T> ConfigExt for T {}

/// Split a comma-separated value into trimmed, non-empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
