use ibc_block::Name;
use ibc_merkle::{Digest, MerkleError};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    #[error("chain {0} is not tracked")]
    UnknownChain(Name),
    #[error("block {block_num} of chain {chain} is not stored")]
    UnknownBlock { chain: Name, block_num: u32 },
    #[error("chain {chain}: expected block {expected}, got {got}")]
    OutOfOrder { chain: Name, expected: u32, got: u32 },
    #[error("chain {chain}: block {block_num} does not extend head {head_id}, previous is {previous}")]
    PreviousMismatch {
        chain: Name,
        block_num: u32,
        head_id: Digest,
        previous: Digest,
    },
    #[error("chain {chain}: block {block_num} is outside the provable range {first}..={anchor}")]
    OutOfRange {
        chain: Name,
        block_num: u32,
        first: u32,
        anchor: u32,
    },
}
