//! Block inclusion proofs against the tracked accumulator of a peer chain.
//!
//! Paths are cut from a [`MerkleTree`] over the stored block ids. The tree pairs a trailing
//! odd node with itself, which is how the accumulator folds a partial subtree, and every path
//! is checked against the stored anchor root before it is returned. A disagreement between
//! the two surfaces as `VerificationFailure` and no proof is emitted.

use ibc_block::Name;
use ibc_merkle::{verify_or_err, Digest, MerkleError, MerkleTree};
use ibc_verify::BlockInclusionProof;
use tracing::info;

use crate::error::RelayError;
use crate::store::TrackerStore;

/// Accumulator root right after `anchor_block_num` was ingested
pub async fn anchor_root(
    store: &dyn TrackerStore,
    chain: Name,
    anchor_block_num: u32,
) -> Result<Digest, RelayError> {
    let record = store
        .get_block(chain, anchor_block_num)
        .await?
        .ok_or(RelayError::UnknownBlock {
            chain,
            block_num: anchor_block_num,
        })?;
    Ok(record.root)
}

/// Build a proof that `block_num` is committed to by the accumulator root at
/// `anchor_block_num`.
///
/// The leaf list is rebuilt from the stored block ids of the first tracked block up to the
/// anchor, and the resulting path is checked against the stored anchor root before it is
/// returned.
pub async fn prove_block(
    store: &dyn TrackerStore,
    chain: Name,
    block_num: u32,
    anchor_block_num: u32,
) -> Result<BlockInclusionProof, RelayError> {
    let snapshot = store
        .load_chain(chain)
        .await?
        .ok_or(RelayError::UnknownChain(chain))?;

    let first = snapshot.first_block_num;
    if block_num < first || block_num > anchor_block_num || anchor_block_num > snapshot.head_block_num {
        return Err(RelayError::OutOfRange {
            chain,
            block_num,
            first,
            anchor: anchor_block_num.min(snapshot.head_block_num),
        });
    }

    info!(
        "Proving block {} of chain {} against anchor block {} ...",
        block_num, chain, anchor_block_num
    );

    let ids = store.get_block_ids(chain, first, anchor_block_num).await?;
    let expected = (anchor_block_num - first) as usize + 1;
    if ids.len() != expected {
        return Err(MerkleError::StructuralCorruption(format!(
            "chain {chain}: expected {expected} stored block ids, found {}",
            ids.len()
        ))
        .into());
    }

    let index = (block_num - first) as usize;
    let path = MerkleTree::new(ids).proof(index)?;

    let record = store
        .get_block(chain, block_num)
        .await?
        .ok_or(RelayError::UnknownBlock { chain, block_num })?;
    let root = anchor_root(store, chain, anchor_block_num).await?;
    verify_or_err(&record.id, &path, &root)?;

    Ok(BlockInclusionProof {
        block_header: record.header,
        block_id_path: path,
        anchor_block_num,
    })
}
