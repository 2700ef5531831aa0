use std::path::PathBuf;

use clap::{command, Parser, Subcommand};
use ibc_relay::config::{RelayConfig, DEFAULT_DB_PATH};
use tracing::{error, info, subscriber::set_global_default};
use tracing_subscriber::filter::EnvFilter;

mod prove;
mod root;
mod track;
mod verify;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the database storing tracked chains
    #[arg(long, env = "IBC_RELAY_DB", default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,
    /// Logging level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    /// Ingest finalized block headers of a peer chain
    Track(track::TrackArgs),
    /// Print the accumulator root of a tracked chain
    Root(root::RootArgs),
    /// Build a block inclusion proof
    ProveBlock(prove::ProveBlockArgs),
    /// Verify a cross-chain transaction proof
    Verify(verify::VerifyArgs),
}

fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber_builder =
        tracing_subscriber::fmt::Subscriber::builder().with_env_filter(env_filter);

    let subscriber = subscriber_builder.with_writer(std::io::stderr).finish();
    set_global_default(subscriber).expect("Failed to set subscriber");
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = RelayConfig {
        db_path: cli.db_path,
    };

    let res = match cli.command {
        Commands::Track(args) => track::run(&config, args).await,
        Commands::Root(args) => root::run(&config, args).await,
        Commands::ProveBlock(args) => prove::run(&config, args).await,
        Commands::Verify(args) => verify::run(&config, args).await,
    };

    match res {
        Ok(_) => {
            info!("IBC relay has exited without errors");
            std::process::exit(0);
        }
        Err(err) => {
            error!("IBC relay has exited with error: {}", err);
            std::process::exit(1);
        }
    }
}
