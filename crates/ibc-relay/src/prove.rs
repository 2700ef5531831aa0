//! CLI wrapper for block inclusion proofs

use std::path::PathBuf;

use ibc_block::Name;
use ibc_relay::{prove_block, RelayConfig, RelayError, TrackerStore};
use tracing::info;

/// CLI arguments for the `prove-block` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct ProveBlockArgs {
    /// Peer chain name
    #[arg(long)]
    chain: Name,
    /// Block to prove
    #[arg(long)]
    block_num: u32,
    /// Anchor block whose accumulator root the proof targets (defaults to the chain head)
    #[arg(long)]
    anchor_block_num: Option<u32>,
    /// Path to save the proof (prints to stdout if omitted)
    #[arg(long)]
    proof_path: Option<PathBuf>,
}

/// Run the `prove-block` subcommand: build a block inclusion proof and write it as JSON
pub async fn run(config: &RelayConfig, args: ProveBlockArgs) -> Result<(), anyhow::Error> {
    let store = config.open_store().await?;
    let anchor_block_num = match args.anchor_block_num {
        Some(anchor) => anchor,
        None => {
            store
                .load_chain(args.chain)
                .await?
                .ok_or(RelayError::UnknownChain(args.chain))?
                .head_block_num
        }
    };

    let proof = prove_block(store.as_ref(), args.chain, args.block_num, anchor_block_num).await?;
    let json = serde_json::to_string_pretty(&proof)?;

    match args.proof_path {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            info!("Proof saved to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
