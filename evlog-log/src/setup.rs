use std::env;

use tracing_subscriber::EnvFilter;

use crate::{LogConfig, LogFormat};

/// Crates of this workspace that log at the configured level.
///
/// Third-party crates are capped at `info` unless `RUST_LOG` says otherwise.
const CRATE_NAMES: &[&str] = &[
    "evlog",
    "evlog_common",
    "evlog_config",
    "evlog_drain",
    "evlog_event",
    "evlog_sampling",
];

fn default_filter(config: &LogConfig) -> EnvFilter {
    let level = config.level.level_filter();
    let mut filter = EnvFilter::new("info");

    for name in CRATE_NAMES {
        // The directive format is fixed, parsing cannot fail.
        if let Ok(directive) = format!("{name}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    filter
}

/// Initialize the logging system.
///
/// The `RUST_LOG` environment variable, if set, takes precedence over the configured level.
/// Calling this more than once has no effect.
///
/// # Example
///
/// ```
/// let log_config = evlog_log::LogConfig {
///     level: evlog_log::Level::Debug,
///     ..Default::default()
/// };
///
/// evlog_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    let filter = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => default_filter(config),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match (config.format, console::user_attended()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => builder.pretty().try_init(),
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            builder.with_ansi(false).compact().try_init()
        }
        (LogFormat::Json, _) => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("logger already initialized");
    }
}
