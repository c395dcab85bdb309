use hive_gateway_executor_config::log::{LogLevel, LoggingConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer};

pub type DynLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

pub fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// `log.filter` wins when it parses. An invalid directive falls back
/// to the plain `log.level`.
pub fn create_env_filter(config: &LoggingConfig) -> EnvFilter {
    let fallback = || {
        EnvFilter::builder()
            .with_default_directive(level_filter(&config.level).into())
            .parse_lossy("")
    };

    match config.filter.as_deref() {
        Some(directives) => EnvFilter::builder()
            .with_default_directive(level_filter(&config.level).into())
            .parse(directives)
            .unwrap_or_else(|_| fallback()),
        None => fallback(),
    }
}
