//! Structured logging initialization
//!
//! Provides consistent logging initialization across mongo-init components.

use crate::config::ConfigExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Guard that keeps the tracing subscriber active.
/// Drop this at the end of main to flush logs.
pub struct LogGuard;

/// Initialize structured logging for a component.
///
/// Defaults to INFO; `RUST_LOG` adds directives and `LOG_FORMAT=json`
/// switches to JSON lines for log collectors.
///
/// # Example
/// ```ignore
/// let _guard = init_logging("mongo-init");
/// info!("Starting up...");
/// ```
pub fn init_logging(component: &str) -> LogGuard {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let registry = tracing_subscriber::registry().with(filter);

    if String::env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_target(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }

    tracing::debug!(component, "Logging initialized");

    LogGuard
}
