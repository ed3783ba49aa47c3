//! `wohnfair-ml-config`: typed settings for the WohnFair ML service.
//!
//! Settings are grouped by concern (database, cache, analytics store,
//! object storage, model, training, evaluation, monitoring, experiment
//! tracking). Each group reads its own environment prefix (`DB_`,
//! `REDIS_`, `CLICKHOUSE_`, `MINIO_`, `MODEL_`, `TRAINING_`, `EVALUATION_`,
//! `MONITORING_`, `MLFLOW_`, plus `SERVICE_` for the HTTP listener).
//!
//! Building settings happens in two steps:
//! 1. [`ConfigLoader::load`] merges defaults, an optional TOML file and the
//!    environment (plus an optional `.env` file) into a [`Settings`] value,
//!    with every path made absolute.
//! 2. [`Settings::ensure_directories`] creates the configured directories.
//!
//! [`SettingsRegistry`] (and the [`get_settings`] / [`reload_settings`]
//! wrappers) run both steps and cache the result. The process-wide registry
//! also reads `.env` from the working directory on every build.

mod env;
mod error;
mod groups;
mod loader;
mod registry;
mod settings;

pub use env::EnvLayer;
pub use error::{ConfigError, ErrorKind, Result};
pub use groups::{
    ClickHouseSettings, DatabaseSettings, EvaluationSettings, MinioSettings, MlflowSettings,
    ModelSettings, MonitoringSettings, RedisSettings, ServerSettings, TrainingSettings,
};
pub use loader::{ConfigLoader, SETTINGS_FILE_ENV};
pub use registry::{
    SettingsRegistry, get_artifact_dir, get_clickhouse_config, get_database_url, get_log_dir,
    get_minio_config, get_model_dir, get_redis_url, get_settings, is_debug_mode,
    is_distributed_training, is_mlflow_enabled, is_prometheus_enabled, is_tracing_enabled,
    reload_settings,
};
pub use settings::{REDACTED, RESERVED_PATHS, Settings};
