mod cli;
mod commands;
mod config;
mod error;
mod home;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("ESMFold runner v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result = match cli.command {
        Commands::Install(args) => {
            info!("Dispatching to 'install' command.");
            commands::install::run(args).await
        }
        Commands::Predict(args) => {
            info!("Dispatching to 'predict' command.");
            commands::predict::run(args).await
        }
        Commands::Annotate(args) => {
            info!("Dispatching to 'annotate' command.");
            commands::annotate::run(args).await
        }
        Commands::Scores(args) => {
            info!("Dispatching to 'scores' command.");
            commands::scores::run(args).await
        }
        Commands::Env(args) => {
            info!("Dispatching to 'env' command.");
            commands::env::run(args).await
        }
    };

    match &command_result {
        Ok(_) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
