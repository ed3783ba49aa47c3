//! `wohnfair-ml show-settings`

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use wohnfair_ml_config::Settings;

#[derive(Debug, Default, Parser)]
pub struct ShowSettingsArgs {
    /// Print passwords and secret keys instead of masking them
    #[arg(long)]
    pub show_secrets: bool,
}

impl ShowSettingsArgs {
    pub fn run(&self, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
        let rendered = if self.show_secrets {
            toml::to_string_pretty(settings)
        } else {
            toml::to_string_pretty(&settings.redacted())
        }
        .context("failed to serialize settings")?;
        out.write_all(rendered.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wohnfair_ml_config::{ConfigLoader, REDACTED};

    fn render(show_secrets: bool) -> String {
        let mut out = Vec::new();
        ShowSettingsArgs { show_secrets }
            .run(&Settings::default(), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn secrets_are_masked_by_default() {
        let text = render(false);
        assert!(!text.contains("wohnfair_pass"));
        assert!(text.contains(&format!("secret_key = \"{REDACTED}\"")));
        assert!(text.contains("[server]"));
    }

    #[test]
    fn show_secrets_prints_credentials() {
        assert!(render(true).contains("wohnfair_pass"));
    }

    #[test]
    fn output_loads_back() {
        let reparsed = ConfigLoader::parse(&render(true)).unwrap();
        assert_eq!(reparsed, Settings::default());
    }
}
