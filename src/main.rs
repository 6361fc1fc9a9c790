use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::path::Path;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod config;
mod ui;

/// Logs go to a daily file since the terminal belongs to the UI.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("failed to create log dir {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, "lucky-ten.log"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("failed to init tracing: {e}"))?;
    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = config::Cli::parse().into_config()?;
    let _guard = init_tracing(&config.log_dir)?;
    tracing::info!(contract = %config.contract, "starting lucky-ten");
    client::run_app(config).await
}
