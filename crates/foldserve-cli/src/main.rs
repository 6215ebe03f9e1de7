mod backend;
mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod server;
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

    info!("🚀 foldserve v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result = match cli.command {
        Commands::Serve(args) => {
            info!("Dispatching to 'serve' command.");
            commands::serve::run(args).await
        }
        Commands::Fold(args) => {
            info!("Dispatching to 'fold' command.");
            commands::fold::run(args).await
        }
        Commands::Status(args) => {
            info!("Dispatching to 'status' command.");
            commands::status::run(args).await
        }
        Commands::Bench(args) => {
            info!("Dispatching to 'bench' command.");
            commands::bench::run(args).await
        }
    };

    match &command_result {
        Ok(()) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }
    command_result
}
