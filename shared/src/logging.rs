//! Shared logging utilities for consistent tracing across planner components

use crate::types::ComponentId;
use chrono::{DateTime, Utc};
use tracing::info;

/// Filter directive used when no level is supplied
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the env-filter directive for the planner crates
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    format!("planner={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the stdout tracing subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = filter_directive(log_level);

    let _ = fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

pub fn init_tracing() {
    init_tracing_with_level(None);
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware error logging
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware debug logging
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: ComponentId, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: ComponentId, context: &str, error: &dyn std::fmt::Display) {
    crate::component_error!(component, error = %error, "❌ {} failed: {}", context, error);
}

/// Contextual logging helper for success conditions
pub fn log_success(component: ComponentId, message: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(component: ComponentId, action: &str, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}
