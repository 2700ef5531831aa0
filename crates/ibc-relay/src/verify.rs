//! CLI wrapper for the verify functionality

use std::path::PathBuf;

use ibc_merkle::Digest;
use ibc_relay::{anchor_root, RelayConfig};
use ibc_verify::{verify_proof, CrossChainProof, VerifierConfig};
use tracing::info;

/// CLI arguments for the `verify` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct VerifyArgs {
    /// Path to read the JSON proof from
    #[arg(long)]
    proof_path: PathBuf,
    /// Trusted accumulator root at the anchor block (looked up in the database if omitted)
    #[arg(long)]
    anchor_root: Option<Digest>,
}

/// Run the `verify` subcommand: read a proof from disk and verify it
pub async fn run(config: &RelayConfig, args: VerifyArgs) -> Result<(), anyhow::Error> {
    let data = tokio::fs::read_to_string(&args.proof_path).await?;
    let proof: CrossChainProof = serde_json::from_str(&data)?;

    let root = match args.anchor_root {
        Some(root) => root,
        None => {
            let store = config.open_store().await?;
            anchor_root(store.as_ref(), proof.chain, proof.block.anchor_block_num).await?
        }
    };
    info!(
        "Verifying proof for chain {} against root {} at block {}",
        proof.chain, root, proof.block.anchor_block_num
    );

    let verified = verify_proof(&proof, &root, &VerifierConfig::default())?;
    println!("{}", serde_json::to_string_pretty(&verified)?);
    Ok(())
}
