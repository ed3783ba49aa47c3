//! Command-line front end for the WohnFair ML service.
//!
//! Every subcommand starts the same way. It layers settings from defaults,
//! an optional TOML file, `.env` and the environment. Then it creates the
//! data directories and installs the tracing subscriber.

pub mod logging;
pub mod serve_cmd;
pub mod settings_cmd;
pub mod stub_cmd;

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use wohnfair_ml_config::{ConfigLoader, Settings};

use crate::serve_cmd::ServeArgs;
use crate::settings_cmd::ShowSettingsArgs;
use crate::stub_cmd::{EvaluateArgs, TrainArgs};

/// WohnFair ML service tooling
#[derive(Debug, Parser)]
#[command(name = "wohnfair-ml", version, about)]
pub struct Cli {
    /// TOML settings file layered between the defaults and the environment
    /// (default: $WOHNFAIR_ML_SETTINGS_FILE when set)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the health, status and metrics endpoints
    Serve(ServeArgs),

    /// Run a training job (placeholder)
    Train(TrainArgs),

    /// Evaluate a trained model (placeholder)
    Evaluate(EvaluateArgs),

    /// Print the effective settings as TOML
    ShowSettings(ShowSettingsArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let settings = load_settings(self.settings_file.as_deref())?;
        let _log_guard = logging::init(&settings)?;
        tracing::debug!(
            service = %settings.service_name,
            version = %settings.service_version,
            "Settings loaded"
        );

        let mut stdout = std::io::stdout();
        match self.command {
            Command::Serve(args) => serve_cmd::run(args, settings).await,
            Command::Train(args) => args.run(&settings, &mut stdout).await,
            Command::Evaluate(args) => args.run(&settings, &mut stdout).await,
            Command::ShowSettings(args) => {
                args.run(&settings, &mut stdout)?;
                stdout.flush()?;
                Ok(())
            }
        }
    }
}

/// Build the settings for this invocation and make sure every configured
/// directory exists. Variables from `.env` in the working directory fill in
/// whatever the process environment leaves unset.
pub fn load_settings(settings_file: Option<&Path>) -> anyhow::Result<Arc<Settings>> {
    let mut loader = ConfigLoader::new().with_dotenv(".env");
    if let Some(path) = settings_file {
        loader = loader.with_file(path);
    }
    let settings = loader.load().context("failed to load settings")?;
    settings
        .ensure_directories()
        .context("failed to prepare directories")?;
    Ok(Arc::new(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_global_settings_file_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wohnfair-ml",
            "train",
            "--settings-file",
            "ml.toml",
            "--config",
            "run.yaml",
        ])
        .unwrap();
        assert_eq!(cli.settings_file, Some(PathBuf::from("ml.toml")));
        match cli.command {
            Command::Train(args) => assert_eq!(args.config, "run.yaml"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_settings_is_kebab_case() {
        let cli = Cli::try_parse_from(["wohnfair-ml", "show-settings", "--show-secrets"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::ShowSettings(ShowSettingsArgs { show_secrets: true })
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["wohnfair-ml"]).is_err());
    }

    #[test]
    fn missing_settings_file_is_reported() {
        let err = load_settings(Some(Path::new("/nonexistent/wohnfair.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load settings"));
    }
}
