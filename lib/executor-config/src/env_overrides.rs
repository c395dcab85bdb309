use config::{builder::BuilderState, ConfigBuilder, ConfigError};
use envconfig::Envconfig;
use tracing::debug;

use crate::log::{LogFormat, LogLevel};

#[derive(Envconfig)]
pub struct EnvVarOverrides {
    // Logger overrides
    #[envconfig(from = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,
    #[envconfig(from = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
    #[envconfig(from = "LOG_FILTER")]
    pub log_filter: Option<String>,

    // Executor overrides
    #[envconfig(from = "EXPOSE_QUERY_PLAN")]
    pub expose_query_plan: Option<bool>,
    #[envconfig(from = "ANNOTATE_SUBGRAPH_ERRORS")]
    pub annotate_subgraph_errors: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvVarOverridesError {
    #[error("Failed to override configuration: {0}")]
    FailedToOverrideConfig(#[from] ConfigError),
}

impl EnvVarOverrides {
    pub fn apply_overrides<T: BuilderState>(
        mut self,
        mut config: ConfigBuilder<T>,
    ) -> Result<ConfigBuilder<T>, EnvVarOverridesError> {
        if let Some(log_level) = self.log_level.take() {
            debug!("[config-override] 'log.level' = {:?}", log_level);
            config = config.set_override("log.level", AsRef::<str>::as_ref(&log_level))?;
        }
        if let Some(log_format) = self.log_format.take() {
            debug!("[config-override] 'log.format' = {:?}", log_format);
            config = config.set_override("log.format", AsRef::<str>::as_ref(&log_format))?;
        }
        if let Some(log_filter) = self.log_filter.take() {
            debug!("[config-override] 'log.filter' = {:?}", log_filter);
            config = config.set_override("log.filter", log_filter)?;
        }

        if let Some(expose_query_plan) = self.expose_query_plan.take() {
            debug!(
                "[config-override] 'executor.expose_query_plan' = {}",
                expose_query_plan
            );
            config = config.set_override("executor.expose_query_plan", expose_query_plan)?;
        }
        if let Some(annotate) = self.annotate_subgraph_errors.take() {
            debug!(
                "[config-override] 'executor.annotate_subgraph_errors' = {}",
                annotate
            );
            config = config.set_override("executor.annotate_subgraph_errors", annotate)?;
        }

        Ok(config)
    }
}
