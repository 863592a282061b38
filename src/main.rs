//! PWICE - character roleplay terminal
//!
#![doc = "PWICE - character roleplay terminal"]
#![doc = "Main entry point for the PWICE application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pwice::catalog::Catalog;
use pwice::cli::{Cli, Commands};
use pwice::commands;
use pwice::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let catalog = match &cli.catalog {
        Some(path) => {
            tracing::info!("Using catalog override: {}", path);
            Catalog::from_file(path)?
        }
        None => Catalog::embedded()?,
    };

    // Execute command
    match cli.command() {
        Commands::Session => {
            tracing::debug!(model = %config.gateway.model, "Session model");
            commands::session::run_session(config, catalog).await?;
            Ok(())
        }
        Commands::Characters { json } => commands::personnel::list_characters(&catalog, json),
        Commands::Profile { id } => commands::personnel::show_profile(&catalog, &id),
        Commands::Watch { id, json } => commands::personnel::show_watch(&catalog, &id, json),
        Commands::Auth => commands::auth::authenticate(&config),
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with the transcript.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "pwice=debug" } else { "pwice=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
