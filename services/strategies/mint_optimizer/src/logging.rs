//! Emoji-tagged log macros for optimizer events
//!
//! Candidate search and gas pricing log at debug; chosen plans and cache
//! statistics log at info.

/// Tags prefixed to optimizer log lines
pub struct LogEmoji;

impl LogEmoji {
    pub const SEARCH: &'static str = "🔍"; // Enumerating candidates
    pub const CHART: &'static str = "📊"; // Cache statistics
    pub const MONEY: &'static str = "💰"; // Chosen plan
    pub const GAS: &'static str = "⛽"; // Gas penalty
}

#[macro_export]
macro_rules! log_search {
    ($($arg:tt)*) => {
        tracing::debug!("{} {}", $crate::logging::LogEmoji::SEARCH, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_metrics {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CHART, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_gas {
    ($($arg:tt)*) => {
        tracing::debug!("{} {}", $crate::logging::LogEmoji::GAS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_profit {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::MONEY, format!($($arg)*))
    };
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process
///
/// Later calls are no-ops, so every test may call it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
