//! `wohnfair-ml train` and `wohnfair-ml evaluate`.
//!
//! Both commands only announce themselves, wait, and report completion.

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use wohnfair_ml_config::Settings;

/// How long each placeholder job pretends to work.
pub const STUB_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
pub struct TrainArgs {
    /// Training configuration file (not read yet)
    #[arg(long, value_name = "PATH", default_value = "config/config.yaml")]
    pub config: String,
}

impl TrainArgs {
    pub async fn run(self, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
        tracing::info!(
            config = %self.config,
            distributed = settings.is_distributed_training(),
            "Training requested"
        );
        writeln!(out, "Starting training with config: {}", self.config)?;
        out.flush()?;
        tokio::time::sleep(STUB_DURATION).await;
        writeln!(out, "Training complete (stub)")?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct EvaluateArgs {
    /// Model artifact to evaluate
    #[arg(long, value_name = "PATH")]
    pub model: Option<String>,

    /// Evaluation dataset
    #[arg(long, value_name = "PATH")]
    pub data: Option<String>,
}

impl EvaluateArgs {
    pub async fn run(self, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
        let model = self.model.as_deref().unwrap_or("None");
        let data = self.data.as_deref().unwrap_or("None");
        tracing::info!(
            model,
            data,
            model_dir = %settings.model_dir().display(),
            "Evaluation requested"
        );
        writeln!(out, "Evaluating model={model} on data={data}")?;
        out.flush()?;
        tokio::time::sleep(STUB_DURATION).await;
        writeln!(out, "Evaluation complete (stub)")?;
        out.flush()?;
        Ok(())
    }
}
