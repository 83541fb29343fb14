use evlog_config::Config;

/// Initializes internal logging of evlog from the config.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &Config) {
    evlog_log::init(&config.logging);
    evlog_log::debug!(
        level = %config.logging.level,
        batch_size = config.drain.batch.size,
        flush_interval_ms = config.drain.batch.interval_ms,
        max_buffer_size = config.drain.max_buffer_size,
        keeps_all = config.sampling.keeps_all(),
        "evlog initialized"
    );
}
