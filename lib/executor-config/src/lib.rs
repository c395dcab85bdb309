mod env_overrides;
pub mod executor;
pub mod log;

use std::path::PathBuf;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    executor::ExecutorConfig,
    log::LoggingConfig,
};

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GatewayExecutorConfig {
    /// The logger configuration.
    ///
    /// Defaults to `info` level in release builds, and `debug` in dev builds.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Query plan execution settings.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "gateway.config.yaml",
    "gateway.config.yml",
    "gateway.config.json",
    "gateway.config.json5",
];

/// Loads the configuration from `config_path`, or from the first
/// `gateway.config.*` file found in the working directory.
/// Environment variables are applied on top.
pub fn load_config(config_path: Option<String>) -> Result<GatewayExecutorConfig, ExecutorConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();

    match config_path {
        Some(path) => {
            let as_file: File<FileSourceFile, _> = PathBuf::from(path).into();
            config = config.add_source(as_file.required(true));
        }
        None => {
            for name in DEFAULT_FILE_NAMES {
                config = config.add_source(File::with_name(name).required(false));
            }
        }
    }

    config = env_overrides.apply_overrides(config)?;

    Ok(config.build()?.try_deserialize::<GatewayExecutorConfig>()?)
}

pub fn parse_yaml_config(config_raw: &str) -> Result<GatewayExecutorConfig, ExecutorConfigError> {
    Config::builder()
        .add_source(File::from_str(config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<GatewayExecutorConfig>()
        .map_err(ExecutorConfigError::ConfigLoadError)
}
