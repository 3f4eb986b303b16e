use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use coffee_bar_app::cli::Cli;
use coffee_bar_app::{commands, App};
use coffee_bar_core::CoreError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = coffee_bar_config::load_from_env()
        .map_err(|error| CoreError::Configuration(error.to_string()))?;
    init_file_logging(&config.log_path())?;
    tracing::debug!(gateway = %config.gateway_url, "configuration loaded");

    let app = App::from_config(config)?;
    let mut out = io::stdout();
    commands::run(&app, cli.command, &mut out).await
}

fn report(error: &anyhow::Error) {
    tracing::warn!(error = %error, "command failed");
    eprintln!("error: {error:#}");
    if let Some(core) = error.downcast_ref::<CoreError>() {
        eprintln!("next step: {}", core.next_action());
    }
}

fn init_file_logging(log_path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CoreError::Configuration(format!(
                    "failed to create coffee-bar log directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|error| {
            CoreError::Configuration(format!(
                "failed to open coffee-bar log file '{}': {error}",
                log_path.display()
            ))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}
