pub mod stdout;
pub mod utils;

use hive_gateway_executor_config::log::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::{logging::stdout::build_stdout_layer, BoxError};

/// Installs the global subscriber with a single stdout layer.
///
/// The returned guard flushes buffered lines on drop, so it must live
/// as long as the process logs anything.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard, BoxError> {
    let (layer, guard) = build_stdout_layer::<Registry>(config);

    tracing_subscriber::registry().with(layer).try_init()?;

    Ok(guard)
}
