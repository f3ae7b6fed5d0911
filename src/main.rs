// tunedeck - terminal music player
// Open a folder, play what's in it, watch it move

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tunedeck::config::{Config, SettingsStore, Theme};
use tunedeck::ui::{App, AppOptions};

#[derive(Parser)]
#[command(name = "tunedeck")]
#[command(about = "Folder-based terminal music player with lyrics and live visuals")]
struct Args {
    /// Folder to open instead of the last one used
    folder: Option<PathBuf>,

    /// Also write a verbose tunedeck-dev.log next to the regular log
    #[arg(long)]
    dev: bool,

    /// Override the colour theme for this session
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Don't show desktop notifications
    #[arg(long)]
    no_notify: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

/// File-only logging: the terminal belongs to the UI, so nothing may reach
/// stderr while it runs. Keep the guards alive until exit.
fn init_logging(log_dir: &Path, dev: bool) -> Result<Vec<WorkerGuard>> {
    std::fs::create_dir_all(log_dir)?;
    let mut guards = Vec::new();

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, "tunedeck.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    guards.push(guard);

    // Base filter: info level for general logs, debug for tunedeck
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tunedeck=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_filter(filter);

    // Dev mode adds a verbose, non-rotating log with source locations
    let dev_layer = if dev {
        let dev_appender = tracing_appender::rolling::never(log_dir, "tunedeck-dev.log");
        let (dev_writer, guard) = tracing_appender::non_blocking(dev_appender);
        guards.push(guard);
        Some(
            fmt::layer()
                .with_writer(dev_writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_filter(EnvFilter::new("debug,tunedeck=trace")),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(dev_layer)
        .try_init()?;

    Ok(guards)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load config - falls back to defaults if missing
    let config = Config::load()?;
    let _log_guards = init_logging(&config.log_directory, args.dev)?;
    info!("tunedeck starting up");

    let settings = SettingsStore::open(Config::config_dir()?.join("settings.toml"));
    let options = AppOptions {
        folder: args.folder,
        theme: args.theme.map(Theme::from),
        notifications: !args.no_notify,
    };

    // Single UI thread; tag parsing goes to the blocking pool
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async move {
        let mut app = App::new(config, settings, options)?;
        app.run().await
    })?;

    info!("tunedeck exited cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_logging_goes_to_a_second_file() {
        let dir = tempfile::tempdir().unwrap();
        let guards = init_logging(dir.path(), true).unwrap();
        assert_eq!(guards.len(), 2);

        tracing::debug!(target: "tunedeck", "dev log line");
        drop(guards);

        let dev_log = std::fs::read_to_string(dir.path().join("tunedeck-dev.log")).unwrap();
        assert!(dev_log.contains("dev log line"));
    }
}
