//! Log output for the cistep binary
//!
//! One line per event on stderr: RFC 3339 UTC timestamp, level tag, message.
//! No ANSI colours, since CI log viewers rarely render them in timestamps.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "CISTEP_LOG";

/// Pick the filter: `CISTEP_LOG` wins, then `-v`, then the configured level
pub fn build_filter(config_level: &str, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    let level = if verbose { "debug" } else { config_level };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber; later calls are no-ops
pub fn init(config_level: &str, verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config_level, verbose))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .compact()
        .try_init();
}
