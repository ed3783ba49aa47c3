//! Layered settings loader.
//!
//! Precedence (later layers override earlier):
//! 1. Defaults compiled into each settings group
//! 2. Settings file (TOML), when one is configured
//! 3. Environment variables, one prefix per group
//!
//! Loading is a pure function of those inputs plus the working directory:
//! it resolves paths but never creates them. Call
//! [`Settings::ensure_directories`] afterwards.
//!
//! ## Example
//!
//! ```no_run
//! use wohnfair_ml_config::ConfigLoader;
//!
//! let settings = ConfigLoader::new()
//!     .with_file("settings.toml")
//!     .load()
//!     .expect("Failed to load settings");
//! settings.ensure_directories().expect("Failed to create directories");
//! ```

use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};

use crate::env::{EnvLayer, EnvOverride};
use crate::error::{ConfigError, Result};
use crate::settings::Settings;

/// Variable naming a settings file when none is passed explicitly.
pub const SETTINGS_FILE_ENV: &str = "WOHNFAIR_ML_SETTINGS_FILE";

/// Builder for layered settings loading.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<EnvLayer>,
    dotenv: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    skip_file: bool,
    skip_env: bool,
}

impl ConfigLoader {
    /// Loader reading the process environment and working directory at
    /// [`ConfigLoader::load`] time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML settings file. A missing file is an error.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use an explicit environment instead of the process environment.
    pub fn with_env(mut self, env: EnvLayer) -> Self {
        self.env = Some(env);
        self
    }

    /// Merge a dotenv file into the environment on every load. Relative
    /// paths are taken from the working directory. Variables already set
    /// win, and a missing file is ignored.
    pub fn with_dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    /// Resolve relative paths against `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Load settings with all enabled layers.
    ///
    /// # Errors
    ///
    /// - `InvalidEnvValue`: a variable cannot be coerced to its field's type
    /// - `ReadFile` / `ParseFile`: the settings file is unreadable or invalid
    /// - `Dotenv`: the dotenv file exists but cannot be parsed
    /// - `Source`: the merged layers do not deserialize
    /// - `Validation`: a value is out of its accepted set
    /// - `WorkingDir` / `ResolvePath`: paths cannot be made absolute
    pub fn load(&self) -> Result<Settings> {
        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(ConfigError::WorkingDir)?,
        };

        let mut env = match &self.env {
            Some(env) => env.clone(),
            None if self.skip_env && self.skip_file => EnvLayer::default(),
            None => EnvLayer::from_process(),
        };
        if let Some(dotenv) = self.dotenv.as_ref().filter(|_| !self.skip_env) {
            env = env.with_dotenv_file(&working_dir.join(dotenv))?;
        }

        // Layer 1: defaults, serialized and loaded as the base source
        let defaults = serde_json::to_value(Settings::default())
            .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
        let mut builder = Config::builder()
            .add_source(File::from_str(&defaults.to_string(), FileFormat::Json));

        // Layer 2
        let file = self
            .file
            .clone()
            .or_else(|| env.get(SETTINGS_FILE_ENV).map(PathBuf::from));
        if let Some(path) = file.filter(|_| !self.skip_file) {
            let contents = Self::read_file(&path)?;
            builder = builder.add_source(File::from_str(&contents, FileFormat::Toml));
        }

        // Layer 3
        let overrides = if self.skip_env {
            Vec::new()
        } else {
            env.overrides(&defaults)?
        };
        for o in &overrides {
            builder = builder.set_override(o.key.as_str(), o.value.clone())?;
        }

        let mut settings: Settings = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| blame_variable(e, &overrides))?;

        settings.resolve_paths(&working_dir)?;
        settings.validate()?;

        tracing::debug!(
            service = %settings.service_name,
            base_dir = %settings.base_dir.display(),
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Parse a TOML settings file on its own, without env overrides.
    /// Unknown keys are rejected.
    pub fn load_from_file(path: &Path) -> Result<Settings> {
        let contents = Self::read_file(path)?;
        Self::parse(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse settings from a TOML string.
    pub fn parse(contents: &str) -> std::result::Result<Settings, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Read a settings file and check it against the schema.
    fn read_file(path: &Path) -> Result<String> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loading settings file {}", path.display());
        Self::parse(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(contents)
    }
}

/// Report a type error on an env-supplied key against the variable it came
/// from.
fn blame_variable(err: config::ConfigError, overrides: &[EnvOverride]) -> ConfigError {
    if let config::ConfigError::Type {
        key: Some(key),
        expected,
        ..
    } = &err
        && let Some(o) = overrides.iter().find(|o| &o.key == key)
    {
        return ConfigError::invalid_env(&o.var, &o.raw, *expected);
    }
    ConfigError::Source(err)
}
