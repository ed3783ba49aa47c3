//! `wohnfair-ml serve`

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use wohnfair_ml_config::Settings;
use wohnfair_ml_server::{HttpServer, ServerConfig};

#[derive(Debug, Default, Parser)]
pub struct ServeArgs {
    /// Interface to bind (default: server.host, 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port (default: server.port, 8000)
    #[arg(long)]
    pub port: Option<u16>,

    /// Worker thread count (default: server.workers, 1)
    #[arg(long)]
    pub workers: Option<usize>,
}

impl ServeArgs {
    /// Listener configuration with command-line flags applied over settings.
    pub fn server_config(&self, settings: &Settings) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::from_settings(settings);
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(workers) = self.workers {
            anyhow::ensure!(workers >= 1, "--workers must be at least 1");
            config.workers = workers;
        }
        Ok(config)
    }
}

/// Serve until Ctrl+C.
pub async fn run(args: ServeArgs, settings: Arc<Settings>) -> anyhow::Result<()> {
    let config = args.server_config(&settings)?;
    let addr = config.addr();
    let server = HttpServer::bind(config).with_context(|| format!("cannot serve on {addr}"))?;
    let shutdown = server.shutdown_handle();

    let mut serving = tokio::task::spawn_blocking(move || server.run());
    tokio::select! {
        joined = &mut serving => {
            joined.context("server task failed")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Signal received, shutting down");
            shutdown.shutdown();
            serving.await.context("server task failed")??;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_override_settings() {
        let args = ServeArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(9000),
            workers: None,
        };
        let config = args.server_config(&Settings::default()).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:9000");
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn settings_apply_without_flags() {
        let mut settings = Settings::default();
        settings.server.workers = 4;
        let config = ServeArgs::default().server_config(&settings).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8000");
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let args = ServeArgs {
            workers: Some(0),
            ..ServeArgs::default()
        };
        assert!(args.server_config(&Settings::default()).is_err());
    }
}
