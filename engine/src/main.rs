// Aula
// Main entry point for the aula binary

use clap::Parser;
use std::path::Path;

use aula_engine::cli::{Cli, Command};
use aula_engine::config::Config;
use aula_engine::handlers::{
    handle_ask, handle_chat, handle_doctor, handle_setup, handle_subjects, OutputFormat,
};
use aula_engine::telemetry::init_telemetry_with_level;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let Cli {
        json,
        log,
        config: config_path,
        command,
    } = Cli::parse();

    // Determine output format
    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Setup may run before any configuration exists
    if let Command::Setup { openai_key } = command {
        init_telemetry_with_level(log.as_deref().unwrap_or("info"));
        return handle_setup(config_path.as_deref(), openai_key, format).await;
    }

    let config = load_config(config_path.as_deref())?;

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(log.as_deref().unwrap_or(&config.core.log_level));

    tracing::info!(
        "Aula v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    // Handle commands
    match command {
        Command::Chat => handle_chat(&config).await,

        Command::Ask { question } => {
            tracing::info!("Answering: {}", question);
            handle_ask(&question, &config, format).await
        }

        Command::Subjects => handle_subjects(&config, format).await,

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Setup { .. } => Ok(()),
    }
}

/// Load configuration (or use custom path if provided)
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_create()?,
    };
    Ok(config)
}
