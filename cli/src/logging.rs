//! Tracing subscriber setup driven by `monitoring.*` settings.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use wohnfair_ml_config::Settings;

/// Filter directive for the configured level. `RUST_LOG` takes precedence
/// when set.
pub fn default_directive(settings: &Settings) -> &'static str {
    if settings.is_debug_mode() {
        return "debug";
    }
    match settings.monitoring.log_level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Install the global subscriber.
///
/// With `monitoring.log_file` set, records go to that file inside `log_dir`
/// through a background writer; keep the returned guard alive until exit so
/// buffered lines are flushed. Otherwise records go to stderr.
pub fn init(settings: &Settings) -> anyhow::Result<Option<WorkerGuard>> {
    let directive = default_directive(settings);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .context("invalid log filter")?;

    let (writer, guard, ansi) = match settings.monitoring.log_file.as_deref() {
        Some(file) => {
            let appender = tracing_appender::rolling::never(settings.log_dir(), file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), None, true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false);
    let installed = if settings.monitoring.log_format.eq_ignore_ascii_case("json") {
        builder.json().with_ansi(false).try_init()
    } else {
        builder.compact().with_ansi(ansi).try_init()
    };
    // A subscriber may already exist when embedded in tests.
    if let Err(e) = installed {
        tracing::debug!("tracing subscriber already installed: {e}");
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn level_aliases_map_to_tracing_levels() {
        let mut settings = Settings::default();
        for (level, expected) in [
            ("INFO", "info"),
            ("WARNING", "warn"),
            ("critical", "error"),
            ("Trace", "trace"),
            ("unexpected", "info"),
        ] {
            settings.monitoring.log_level = level.to_string();
            assert_eq!(default_directive(&settings), expected, "{level}");
        }
    }

    #[test]
    fn debug_mode_forces_debug_level() {
        let mut settings = Settings::default();
        settings.debug = true;
        settings.monitoring.log_level = "ERROR".to_string();
        assert_eq!(default_directive(&settings), "debug");
    }
}
