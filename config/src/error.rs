//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Broad failure class, used by callers that only care whether the
/// environment or the filesystem is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value could not be coerced to its declared type or failed validation.
    Configuration,
    /// Reading the settings file or creating a directory failed.
    Io,
}

impl ErrorKind {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Io => "IO_ERROR",
        }
    }
}

/// Errors raised while building a [`crate::Settings`] value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable holds a value of the wrong shape.
    #[error("invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },

    /// A field was parsed but its value is not acceptable.
    #[error("settings validation error: {0}")]
    Validation(String),

    /// The settings file is not valid TOML or does not match the schema.
    #[error("failed to parse settings file {}: {source}", path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Layering or deserializing the merged sources failed.
    #[error("settings error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("failed to read env file {}: {source}", path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("failed to read settings file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve path {}: {source}", path.display())]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEnvValue { .. }
            | Self::Validation(_)
            | Self::Source(_)
            | Self::Dotenv { .. }
            | Self::ParseFile { .. } => ErrorKind::Configuration,
            Self::ReadFile { .. }
            | Self::ResolvePath { .. }
            | Self::CreateDir { .. }
            | Self::WorkingDir(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_env(
        var: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidEnvValue {
            var: var.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
