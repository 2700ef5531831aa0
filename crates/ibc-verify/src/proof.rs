//! Proof types exchanged between a relay and a verifying chain.
//!
//! All types travel as JSON (serde) or in the packed on-chain layout.

use ibc_block::{BlockHeader, Name};
use ibc_merkle::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use ibc_merkle::{Digest, MerklePath};
use serde::{Deserialize, Serialize};

/// Transaction receipt inclusion in a specific block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInclusionProof {
    /// Digest of the transaction receipt being proven
    pub receipt_digest: Digest,
    /// Path from the receipt digest to the header's transaction root
    pub receipt_path: MerklePath,
    /// Header of the block that includes the transaction
    pub block_header: BlockHeader,
}

/// Block inclusion in the accumulator of block ids tracked for a peer chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInclusionProof {
    /// Header of the proven block
    pub block_header: BlockHeader,
    /// Path from the block id to the accumulator root at `anchor_block_num`
    pub block_id_path: MerklePath,
    /// Last block appended to the accumulator when its root was taken
    pub anchor_block_num: u32,
}

/// A self-contained proof that a transaction happened on `chain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainProof {
    /// Peer chain the transaction was executed on
    pub chain: Name,
    pub transaction: TransactionInclusionProof,
    pub block: BlockInclusionProof,
}

impl CrossChainProof {
    pub fn encode(&self) -> Vec<u8> {
        self.to_packed()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_packed(bytes)
    }
}

impl Pack for TransactionInclusionProof {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.receipt_digest);
        writer.write(&self.receipt_path);
        writer.write(&self.block_header);
    }
}

impl Unpack for TransactionInclusionProof {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            receipt_digest: reader.read()?,
            receipt_path: reader.read()?,
            block_header: reader.read()?,
        })
    }
}

impl Pack for BlockInclusionProof {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.block_header);
        writer.write(&self.block_id_path);
        writer.write_u32(self.anchor_block_num);
    }
}

impl Unpack for BlockInclusionProof {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            block_header: reader.read()?,
            block_id_path: reader.read()?,
            anchor_block_num: reader.read_u32("anchor_block_num")?,
        })
    }
}

impl Pack for CrossChainProof {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.chain);
        writer.write(&self.transaction);
        writer.write(&self.block);
    }
}

impl Unpack for CrossChainProof {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            chain: reader.read()?,
            transaction: reader.read()?,
            block: reader.read()?,
        })
    }
}
