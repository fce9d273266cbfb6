//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter directive used when neither `RUST_LOG` nor `LOG_LEVEL` is set.
const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: `RUST_LOG` wins, then `--verbose`, then
/// `LOG_LEVEL`.
#[must_use]
pub fn filter_directive(rust_log: Option<&str>, log_level: Option<&str>, verbose: bool) -> String {
    if let Some(directive) = rust_log.filter(|d| !d.trim().is_empty()) {
        return directive.to_string();
    }
    if verbose {
        return "debug".to_string();
    }
    log_level
        .filter(|l| !l.trim().is_empty())
        .map_or_else(|| DEFAULT_FILTER.to_string(), |l| l.trim().to_lowercase())
}

/// Install the global fmt subscriber.
pub fn init(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let directive = filter_directive(rust_log.as_deref(), log_level.as_deref(), verbose);

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
