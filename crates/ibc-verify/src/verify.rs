//! Verification routines for cross-chain proofs: receipt inclusion in a block header and
//! block inclusion in the tracked accumulator of a peer chain.

use ibc_block::{BlockError, Name};
use ibc_merkle::path::MAX_PATH_LEN;
use ibc_merkle::{verify_or_err, Digest, MerkleError, MerklePath};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::proof::{BlockInclusionProof, CrossChainProof, TransactionInclusionProof};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error("transaction and block proofs reference different headers: {transaction} != {block}")]
    HeaderMismatch { transaction: Digest, block: Digest },
    #[error("block {block_num} is past the anchor block {anchor_block_num}")]
    BlockAfterAnchor { block_num: u32, anchor_block_num: u32 },
    #[error("{kind} path has {len} entries, at most {max} allowed")]
    PathTooLong {
        kind: &'static str,
        len: usize,
        max: usize,
    },
}

/// Configuration parameters controlling verification policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Longest receipt path accepted
    pub max_receipt_path_len: usize,
    /// Longest block id path accepted
    pub max_block_path_len: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_receipt_path_len: 32,
            max_block_path_len: MAX_PATH_LEN,
        }
    }
}

/// Facts established by a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    pub chain: Name,
    pub receipt_digest: Digest,
    pub block_num: u32,
    pub block_id: Digest,
}

/// Verify a cross-chain proof end-to-end against the accumulator root tracked for
/// `proof.chain` at `proof.block.anchor_block_num`.
pub fn verify_proof(
    proof: &CrossChainProof,
    anchor_root: &Digest,
    config: &VerifierConfig,
) -> Result<VerifiedTransaction, VerifyError> {
    let CrossChainProof {
        chain,
        transaction,
        block,
    } = proof;

    // Sanity checks
    let transaction_block_id = transaction.block_header.id();
    let block_id = block.block_header.id();
    if transaction_block_id != block_id {
        return Err(VerifyError::HeaderMismatch {
            transaction: transaction_block_id,
            block: block_id,
        });
    }
    let block_num = block.block_header.block_num();
    if block_num > block.anchor_block_num {
        return Err(VerifyError::BlockAfterAnchor {
            block_num,
            anchor_block_num: block.anchor_block_num,
        });
    }

    info!("Verifying transaction inclusion proof ...");
    verify_transaction(transaction, config)?;

    info!("Verifying block inclusion proof ...");
    verify_block_header(block, anchor_root, config)?;

    info!("Verification successful!");

    Ok(VerifiedTransaction {
        chain: *chain,
        receipt_digest: transaction.receipt_digest,
        block_num,
        block_id,
    })
}

/// Verify that the receipt folds to the transaction root of its block header.
pub fn verify_transaction(
    proof: &TransactionInclusionProof,
    config: &VerifierConfig,
) -> Result<(), VerifyError> {
    check_path_len("receipt", &proof.receipt_path, config.max_receipt_path_len)?;
    verify_or_err(
        &proof.receipt_digest,
        &proof.receipt_path,
        &proof.block_header.transaction_mroot,
    )?;
    Ok(())
}

/// Verify that the block id folds to `anchor_root`.
///
/// Returns the verified block id on success.
pub fn verify_block_header(
    proof: &BlockInclusionProof,
    anchor_root: &Digest,
    config: &VerifierConfig,
) -> Result<Digest, VerifyError> {
    check_path_len("block id", &proof.block_id_path, config.max_block_path_len)?;
    let block_id = proof.block_header.id();
    verify_or_err(&block_id, &proof.block_id_path, anchor_root)?;
    Ok(block_id)
}

fn check_path_len(kind: &'static str, path: &MerklePath, max: usize) -> Result<(), VerifyError> {
    if path.len() > max {
        return Err(VerifyError::PathTooLong {
            kind,
            len: path.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibc_block::{BlockHeader, BlockTimestamp};
    use ibc_merkle::{IncrementalMerkle, MerkleTree};

    struct Fixture {
        headers: Vec<BlockHeader>,
        receipts: Vec<Digest>,
        accumulator: IncrementalMerkle,
    }

    /// Five linked blocks, the third one carrying four receipts
    fn fixture() -> Fixture {
        let receipts: Vec<Digest> = (0..4u8).map(|i| Digest::hash([i; 8])).collect();
        let receipts_tree = MerkleTree::new(receipts.clone());

        let mut headers: Vec<BlockHeader> = Vec::new();
        let mut previous = Digest::ZERO;
        previous.0[..4].copy_from_slice(&99u32.to_be_bytes());
        for i in 0..5u32 {
            let header = BlockHeader {
                timestamp: BlockTimestamp(1000 + i),
                producer: "producer1".parse().unwrap(),
                confirmed: 0,
                previous,
                transaction_mroot: if i == 2 {
                    receipts_tree.root()
                } else {
                    Digest::ZERO
                },
                action_mroot: Digest::ZERO,
                schedule_version: 1,
                new_producers: None,
                header_extensions: Vec::new(),
            };
            previous = header.id();
            headers.push(header);
        }

        let mut accumulator = IncrementalMerkle::new();
        accumulator.append_all(headers.iter().map(BlockHeader::id)).unwrap();
        Fixture {
            headers,
            receipts,
            accumulator,
        }
    }

    fn proof_for(fixture: &Fixture, receipt: usize) -> CrossChainProof {
        let header = fixture.headers[2].clone();
        let receipt_path = MerkleTree::new(fixture.receipts.clone())
            .proof(receipt)
            .unwrap();
        let ids: Vec<Digest> = fixture.headers.iter().map(BlockHeader::id).collect();
        let block_id_path = MerkleTree::new(ids).proof(2).unwrap();
        CrossChainProof {
            chain: "peerchain".parse().unwrap(),
            transaction: TransactionInclusionProof {
                receipt_digest: fixture.receipts[receipt],
                receipt_path,
                block_header: header.clone(),
            },
            block: BlockInclusionProof {
                block_header: header,
                block_id_path,
                anchor_block_num: 104,
            },
        }
    }

    #[test]
    fn test_valid_proof() {
        let fixture = fixture();
        let root = fixture.accumulator.root();
        for receipt in 0..4 {
            let proof = proof_for(&fixture, receipt);
            let verified = verify_proof(&proof, &root, &VerifierConfig::default()).unwrap();
            assert_eq!(verified.block_num, 102);
            assert_eq!(verified.receipt_digest, fixture.receipts[receipt]);
            assert_eq!(verified.block_id, fixture.headers[2].id());
            assert_eq!(BlockHeader::num_from_id(&verified.block_id), 102);
            assert_eq!(verified.chain.to_string(), "peerchain");
        }
    }

    #[test]
    fn test_wrong_anchor_root() {
        let fixture = fixture();
        let proof = proof_for(&fixture, 0);
        let result = verify_proof(&proof, &Digest::hash(b"stale"), &VerifierConfig::default());
        assert!(matches!(
            result,
            Err(VerifyError::Merkle(MerkleError::VerificationFailure(_)))
        ));
    }

    #[test]
    fn test_forged_receipt() {
        let fixture = fixture();
        let mut proof = proof_for(&fixture, 1);
        proof.transaction.receipt_digest = Digest::hash(b"forged");
        let result = verify_proof(&proof, &fixture.accumulator.root(), &VerifierConfig::default());
        assert!(matches!(
            result,
            Err(VerifyError::Merkle(MerkleError::VerificationFailure(_)))
        ));
    }

    #[test]
    fn test_header_mismatch() {
        let fixture = fixture();
        let mut proof = proof_for(&fixture, 0);
        proof.transaction.block_header = fixture.headers[3].clone();
        assert!(matches!(
            verify_proof(&proof, &fixture.accumulator.root(), &VerifierConfig::default()),
            Err(VerifyError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_block_after_anchor() {
        let fixture = fixture();
        let mut proof = proof_for(&fixture, 0);
        proof.block.anchor_block_num = 101;
        assert!(matches!(
            verify_proof(&proof, &fixture.accumulator.root(), &VerifierConfig::default()),
            Err(VerifyError::BlockAfterAnchor {
                block_num: 102,
                anchor_block_num: 101
            })
        ));
    }

    #[test]
    fn test_path_length_limit() {
        let fixture = fixture();
        let proof = proof_for(&fixture, 0);
        let config = VerifierConfig {
            max_receipt_path_len: 1,
            ..Default::default()
        };
        assert!(matches!(
            verify_proof(&proof, &fixture.accumulator.root(), &config),
            Err(VerifyError::PathTooLong { kind: "receipt", .. })
        ));
    }

    #[test]
    fn test_proof_encodings() {
        let fixture = fixture();
        let proof = proof_for(&fixture, 3);

        let json = serde_json::to_string(&proof).unwrap();
        assert_eq!(serde_json::from_str::<CrossChainProof>(&json).unwrap(), proof);

        let bytes = proof.encode();
        assert_eq!(CrossChainProof::decode(&bytes).unwrap(), proof);
        assert!(CrossChainProof::decode(&bytes[..bytes.len() - 2]).is_err());
    }
}
