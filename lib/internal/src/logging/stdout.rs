use std::io::IsTerminal;

use hive_gateway_executor_config::log::{LogFormat, LoggingConfig};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::UtcTime, fmt::MakeWriter, registry::LookupSpan, Layer};

use crate::logging::utils::{create_env_filter, DynLayer};

/// Lines go through a non-blocking writer. The guard flushes them on drop.
pub fn build_stdout_layer<S>(config: &LoggingConfig) -> (DynLayer<S>, WorkerGuard)
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
{
    let stdout = std::io::stdout();
    let ansi = stdout.is_terminal();
    let (writer, guard) = tracing_appender::non_blocking(stdout);

    (format_layer(config, writer, ansi), guard)
}

/// The `fmt` layer for `config.format`, filtered by `config.level` / `config.filter`.
pub fn format_layer<S, W>(config: &LoggingConfig, writer: W, ansi: bool) -> DynLayer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = create_env_filter(config);
    let base = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_timer(UtcTime::rfc_3339());

    match config.format {
        // Span fields of the current fetch travel with every event.
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_ansi(false)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => base
            .compact()
            .with_target(false)
            .with_ansi(ansi)
            .with_filter(filter)
            .boxed(),
    }
}
