//! Settings registry.
//!
//! A [`SettingsRegistry`] owns one [`Settings`] instance at a time and
//! hands out shared `Arc`s to it. Services construct their own registry (or
//! just a `Settings`) and pass it down; the free functions below wrap a
//! single process-wide registry for callers that cannot be threaded through.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::Result;
use crate::groups::{ClickHouseSettings, MinioSettings};
use crate::loader::ConfigLoader;
use crate::settings::Settings;

/// Lazily built, explicitly reloadable settings holder.
#[derive(Debug)]
pub struct SettingsRegistry {
    loader: ConfigLoader,
    current: Mutex<Option<Arc<Settings>>>,
}

impl SettingsRegistry {
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader,
            current: Mutex::new(None),
        }
    }

    /// Return the cached settings, building them on first use.
    ///
    /// Construction runs at most once: concurrent first callers wait for
    /// the one in flight and share its result. Failures are not cached.
    pub fn get(&self) -> Result<Arc<Settings>> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(settings) = current.as_ref() {
            return Ok(Arc::clone(settings));
        }
        let settings = Arc::new(self.build()?);
        *current = Some(Arc::clone(&settings));
        Ok(settings)
    }

    /// Build fresh settings and swap them in.
    ///
    /// On failure the previous instance stays in place. Holders of the old
    /// `Arc` keep seeing the old values.
    pub fn reload(&self) -> Result<Arc<Settings>> {
        let settings = Arc::new(self.build()?);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(Arc::clone(&settings));
        tracing::info!("Settings reloaded");
        Ok(settings)
    }

    /// The cached instance, without triggering construction.
    pub fn current(&self) -> Option<Arc<Settings>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn build(&self) -> Result<Settings> {
        let settings = self.loader.load()?;
        settings.ensure_directories()?;
        Ok(settings)
    }
}

static GLOBAL: OnceLock<SettingsRegistry> = OnceLock::new();

fn global() -> &'static SettingsRegistry {
    GLOBAL.get_or_init(|| SettingsRegistry::new(ConfigLoader::new().with_dotenv(".env")))
}

/// Process-wide settings, read from the environment and `.env` on first call.
pub fn get_settings() -> Result<Arc<Settings>> {
    global().get()
}

/// Rebuild the process-wide settings from the current environment and `.env`.
pub fn reload_settings() -> Result<Arc<Settings>> {
    global().reload()
}

pub fn get_database_url() -> Result<String> {
    Ok(get_settings()?.database_url().to_string())
}

pub fn get_redis_url() -> Result<String> {
    Ok(get_settings()?.redis_url().to_string())
}

pub fn get_clickhouse_config() -> Result<ClickHouseSettings> {
    Ok(get_settings()?.clickhouse_config().clone())
}

pub fn get_minio_config() -> Result<MinioSettings> {
    Ok(get_settings()?.minio_config().clone())
}

pub fn get_model_dir() -> Result<PathBuf> {
    Ok(get_settings()?.model_dir().to_path_buf())
}

pub fn get_artifact_dir() -> Result<PathBuf> {
    Ok(get_settings()?.artifact_dir().to_path_buf())
}

pub fn get_log_dir() -> Result<PathBuf> {
    Ok(get_settings()?.log_dir().to_path_buf())
}

pub fn is_debug_mode() -> Result<bool> {
    Ok(get_settings()?.is_debug_mode())
}

pub fn is_distributed_training() -> Result<bool> {
    Ok(get_settings()?.is_distributed_training())
}

pub fn is_mlflow_enabled() -> Result<bool> {
    Ok(get_settings()?.is_mlflow_enabled())
}

pub fn is_prometheus_enabled() -> Result<bool> {
    Ok(get_settings()?.is_prometheus_enabled())
}

pub fn is_tracing_enabled() -> Result<bool> {
    Ok(get_settings()?.is_tracing_enabled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvLayer;

    fn registry(dir: &std::path::Path, pairs: &[(&str, &str)]) -> SettingsRegistry {
        SettingsRegistry::new(
            ConfigLoader::new()
                .with_env(EnvLayer::from_pairs(pairs.iter().copied()))
                .with_working_dir(dir),
        )
    }

    #[test]
    fn get_returns_same_instance() {
        let tmp = tempfile::TempDir::new().unwrap();
        let registry = registry(tmp.path(), &[]);
        assert!(registry.current().is_none());

        let first = registry.get().unwrap();
        let second = registry.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.current().is_some());
    }

    #[test]
    fn reload_returns_new_instance() {
        let tmp = tempfile::TempDir::new().unwrap();
        let registry = registry(tmp.path(), &[]);

        let first = registry.get().unwrap();
        let reloaded = registry.reload().unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(*first, *reloaded);

        let after = registry.get().unwrap();
        assert!(Arc::ptr_eq(&reloaded, &after));
    }

    #[test]
    fn get_creates_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let settings = registry(tmp.path(), &[("LOG_DIR", "var/log/ml")])
            .get()
            .unwrap();
        assert_eq!(settings.log_dir, tmp.path().join("var/log/ml"));
        for dir in settings.directories() {
            assert!(dir.is_dir(), "{} should exist", dir.display());
        }
    }

    #[test]
    fn failed_construction_is_not_cached() {
        let tmp = tempfile::TempDir::new().unwrap();
        let registry = registry(tmp.path(), &[("REDIS_TIMEOUT", "soon")]);
        assert!(registry.get().is_err());
        assert!(registry.current().is_none());
        assert!(registry.reload().is_err());
    }

    #[test]
    fn reload_picks_up_dotenv_changes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env_file = tmp.path().join(".env");
        std::fs::write(&env_file, "DB_POOL_SIZE=33\n").unwrap();
        let registry = SettingsRegistry::new(
            ConfigLoader::new()
                .with_env(EnvLayer::default())
                .with_dotenv(".env")
                .with_working_dir(tmp.path()),
        );
        assert_eq!(registry.get().unwrap().database.pool_size, 33);

        std::fs::write(&env_file, "DB_POOL_SIZE=44\n").unwrap();
        assert_eq!(registry.get().unwrap().database.pool_size, 33);
        assert_eq!(registry.reload().unwrap().database.pool_size, 44);
    }

    #[test]
    fn concurrent_first_access_builds_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let registry = Arc::new(registry(tmp.path(), &[]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get().unwrap())
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(instances.iter().all(|s| Arc::ptr_eq(s, &instances[0])));
    }
}
