//! Tracing setup for the two run modes.

use chatpoll_core::Config;
use tracing_subscriber::EnvFilter;

/// Logging to stderr for one-shot subcommands. Default: INFO, RUST_LOG override.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();
}

/// File logging for the TUI, so log lines never land on the alternate
/// screen. Default: WARN, RUST_LOG override. Logs to
/// `<config_dir>/chatpoll/chatpoll.log`.
pub fn init_file() {
    if let Err(e) = init_file_inner() {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

fn init_file_inner() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = Config::get_config_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("chatpoll.log"))?;

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_ansi(false)
        .init();

    Ok(())
}
