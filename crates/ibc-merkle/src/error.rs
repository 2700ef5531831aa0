//! Error kinds surfaced by the Merkle primitives.

use thiserror::Error;

use crate::codec::DecodeError;

/// Errors produced while building, loading or checking Merkle structures.
///
/// None of these are retried: every failure is a deterministic function of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The accumulator frontier is inconsistent with its leaf count or root
    #[error("structural corruption: {0}")]
    StructuralCorruption(String),
    /// A path does not fold to the expected root
    #[error("verification failure: {0}")]
    VerificationFailure(String),
    /// Input rejected before any hashing took place
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Packed bytes could not be decoded
    #[error("malformed input: {0}")]
    Decode(#[from] DecodeError),
}
