//! CostGuard CLI - Command-line client for the invoice anomaly API
//!
//! This is the main entry point for the CostGuard CLI application, providing
//! commands for submitting invoices, uploading source files in batches and
//! reviewing flagged anomalies.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::{instrument, Instrument};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Set up colored output
    control::set_override(cli.use_color());

    // Values from a local .env apply to both the config layer and logging
    dotenv::dotenv().ok();

    let result = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => {
            if let Err(e) = init_logging(&cli, &config) {
                eprintln!("Failed to initialize logging: {}", e);
            }
            run(cli, config).await
        }
        Err(e) => Err(e),
    };

    // Handle the result
    match result {
        Ok(()) => {
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli, config), fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    config.validate()?;

    let timer = Timer::new("cli_execution");
    let use_color = cli.use_color() && config.output.color;
    let mut output = OutputWriter::new(cli.output, use_color, cli.quiet, config.output.progress);

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        "Executing command"
    );

    let result = async {
        match cli.command {
            Commands::Health => handlers::handle_health(&config, &mut output).await,
            Commands::Invoice(args) => handlers::handle_invoice(args, &config, &mut output).await,
            Commands::Flagged(args) => handlers::handle_flagged(args, &config, &mut output).await,
            Commands::Create(args) => handlers::handle_create(args, &config, &mut output).await,
            Commands::UpdateAnomaly(args) => handlers::handle_update_anomaly(args, &config, &mut output).await,
            Commands::Upload(args) => handlers::handle_upload(args, &config, &mut output).await,
            Commands::Config(args) => handlers::handle_config(args, &config, &mut output),
            Commands::Completions(args) => handlers::handle_completions(args, &mut std::io::stdout()),
        }
    }
    .instrument(timer.span().clone())
    .await;

    tracing::debug!(elapsed_ms = timer.elapsed().as_millis() as u64, ok = result.is_ok(), "Command finished");
    result
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    // Config file first, then flags, then environment
    let mut logging_config = LoggingConfig::from_config(&config.logging).with_verbosity(cli.verbosity_level());
    logging_config.merge_with_env(|key| std::env::var(key).ok());

    // If quiet mode, only log errors
    if cli.quiet {
        logging_config.level = "error".to_string();
    }

    logging::init_logging(logging_config)
}
