//! Logging initialization with config- or environment-selected formatters.
//!
//! - `json`: structured JSON lines for log aggregation
//! - `pretty` (default): colourful, human-readable output
//!
//! `SCREENLAB_LOG_FORMAT=json|pretty` overrides the configured format and
//! `RUST_LOG` overrides the configured filter. Logs go to stderr so command
//! output on stdout stays machine-readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable that overrides [`LoggingConfig::format`].
pub const LOG_FORMAT_ENV: &str = "SCREENLAB_LOG_FORMAT";

/// Format after applying the environment override.
pub fn effective_format(config: &LoggingConfig) -> LogFormat {
    match std::env::var(LOG_FORMAT_ENV).ok().as_deref().map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
        _ => config.format,
    }
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber installed earlier (tests, embedding applications) is kept.
    match effective_format(config) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
    };
}
