//! Cross-chain inclusion proof verification
//!
//! This crate checks that a transaction receipt is committed to by a peer chain block
//! header, and that the header's block id is a leaf of the accumulator tracked for that
//! chain. The outcome is the verified receipt digest and block number.

pub mod proof;
pub mod verify;

pub use proof::{BlockInclusionProof, CrossChainProof, TransactionInclusionProof};
pub use verify::{
    verify_block_header, verify_proof, verify_transaction, VerifiedTransaction, VerifierConfig,
    VerifyError,
};
