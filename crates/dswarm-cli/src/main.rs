use anyhow::{Context, Result};
use clap::Parser;
use dswarm_cli::cli::{Cli, Commands, LogLevel};
use dswarm_cli::commands;
use dswarm_config::{ConfigLoader, DswarmConfig};
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&cli, &config);
    debug!(config = ?cli.config, "Configuration loaded");

    match cli.command {
        Commands::Compile { job, output } => commands::compile::execute(job, output).await?,
        Commands::Validate { job } => commands::validate::execute(job).await?,
        Commands::Run {
            program,
            inputs,
            format,
            raw,
            store,
        } => commands::run::execute(config, program, inputs, format, raw, store).await?,
        Commands::Schema {
            program,
            input,
            format,
        } => commands::schema::execute(config, program, input, format).await?,
    }

    Ok(())
}

/// Level priority: `--log-level`, `--verbose`, the config file, `RUST_LOG`,
/// then the built-in default
fn init_logging(cli: &Cli, config: &DswarmConfig) {
    let flag = cli
        .log_level
        .or(cli.verbose.then_some(LogLevel::Debug))
        .map(LevelFilter::from);

    let filter = match flag {
        Some(level) => EnvFilter::new(level.to_string()),
        None if cli.config.is_some() => EnvFilter::new(&config.logging.level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.logging.ansi)
        .with_writer(std::io::stderr)
        .init();
}
