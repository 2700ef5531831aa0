//! CLI wrapper for header ingestion

use std::path::PathBuf;

use ibc_block::{BlockHeader, Name};
use ibc_relay::{ChainTracker, RelayConfig};
use serde_json::json;
use tracing::{debug, info};

/// CLI arguments for the `track` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct TrackArgs {
    /// Peer chain name
    #[arg(long)]
    chain: Name,
    /// JSON file with an array of block headers in block order
    #[arg(long)]
    headers_path: PathBuf,
}

/// Run the `track` subcommand: append every new header to the chain accumulator
pub async fn run(config: &RelayConfig, args: TrackArgs) -> Result<(), anyhow::Error> {
    let data = tokio::fs::read_to_string(&args.headers_path).await?;
    let headers: Vec<BlockHeader> = serde_json::from_str(&data)?;
    info!(
        "Loaded {} headers from {}",
        headers.len(),
        args.headers_path.display()
    );

    let store = config.open_store().await?;
    let mut tracker = ChainTracker::restore(store, args.chain).await?;

    let mut ingested = 0usize;
    for header in &headers {
        let block_num = header.block_num();
        if let Some((head_num, _)) = tracker.head() {
            if block_num <= head_num {
                debug!("Skipping already tracked block {}", block_num);
                continue;
            }
        }
        tracker.update(header).await?;
        ingested += 1;
    }

    let (head_block_num, head_id) = tracker
        .head()
        .ok_or_else(|| anyhow::anyhow!("No headers ingested for chain {}", args.chain))?;
    info!(
        "Ingested {} headers, chain {} is at block {}",
        ingested, args.chain, head_block_num
    );

    let summary = json!({
        "chain": args.chain,
        "head_block_num": head_block_num,
        "head_id": head_id,
        "root": tracker.root(),
        "ingested": ingested,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
