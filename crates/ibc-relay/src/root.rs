//! CLI wrapper for accumulator root queries

use ibc_block::Name;
use ibc_relay::{anchor_root, RelayConfig, RelayError, TrackerStore};
use serde_json::json;

/// CLI arguments for the `root` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct RootArgs {
    /// Peer chain name
    #[arg(long)]
    chain: Name,
    /// Block whose accumulator root is requested (defaults to the chain head)
    #[arg(long)]
    block_num: Option<u32>,
}

/// Run the `root` subcommand: print the accumulator root after a given block
pub async fn run(config: &RelayConfig, args: RootArgs) -> Result<(), anyhow::Error> {
    let store = config.open_store().await?;
    let snapshot = store
        .load_chain(args.chain)
        .await?
        .ok_or(RelayError::UnknownChain(args.chain))?;

    let block_num = args.block_num.unwrap_or(snapshot.head_block_num);
    let root = anchor_root(store.as_ref(), args.chain, block_num).await?;

    let output = json!({
        "chain": args.chain,
        "block_num": block_num,
        "first_block_num": snapshot.first_block_num,
        "root": root,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
