//! Logging initialization
//!
//! Logs always go to a daily-rotated file so the interactive console
//! stays clean; verbose mode adds a stderr layer.

use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter
pub const ENV_LOG: &str = "SHELLPILOT_LOG";

fn log_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shellpilot")
        .join("logs")
}

/// Initialize the tracing subscriber.
///
/// Returns the appender guard; it must be kept alive for the process
/// lifetime or buffered log lines are dropped.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;

    let file_appender = tracing_appender::rolling::daily(dir, "shellpilot.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .with(verbose.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    Ok(guard)
}
