//! Per-chain accumulator of block ids.
//!
//! Each tracked peer chain owns one [`ChainTracker`]. Headers are ingested strictly in
//! order, every block id is appended to the chain's accumulator, and the new state is
//! persisted before it becomes visible in memory.

use std::collections::HashMap;
use std::sync::Arc;

use ibc_block::{BlockHeader, Name};
use ibc_merkle::{Digest, IncrementalMerkle, MerkleError};
use tracing::{debug, info};

use crate::error::RelayError;
use crate::store::{BlockRecord, ChainSnapshot, TrackerStore};

pub struct ChainTracker {
    chain: Name,
    accumulator: IncrementalMerkle,
    first_block_num: u32,
    head: Option<(u32, Digest)>,
    store: Arc<dyn TrackerStore>,
}

impl ChainTracker {
    /// Load the tracker of `chain`, or start an empty one if the chain was never tracked.
    ///
    /// The persisted frontier is validated; a corrupted accumulator is a fatal error.
    pub async fn restore(store: Arc<dyn TrackerStore>, chain: Name) -> Result<Self, RelayError> {
        let Some(snapshot) = store.load_chain(chain).await? else {
            info!("Chain {} is not tracked yet", chain);
            return Ok(Self {
                chain,
                accumulator: IncrementalMerkle::new(),
                first_block_num: 0,
                head: None,
                store,
            });
        };

        let accumulator = IncrementalMerkle::decode(&snapshot.frontier)?;
        let expected_leaves = snapshot
            .head_block_num
            .checked_sub(snapshot.first_block_num)
            .map(|span| u64::from(span) + 1);
        if expected_leaves != Some(accumulator.leaf_count()) {
            return Err(MerkleError::StructuralCorruption(format!(
                "chain {chain}: blocks {}..={} do not match {} accumulated leaves",
                snapshot.first_block_num,
                snapshot.head_block_num,
                accumulator.leaf_count()
            ))
            .into());
        }

        let head_record = store
            .get_block(chain, snapshot.head_block_num)
            .await?
            .ok_or(RelayError::UnknownBlock {
                chain,
                block_num: snapshot.head_block_num,
            })?;
        if head_record.root != accumulator.root() || head_record.id != snapshot.head_id {
            return Err(MerkleError::StructuralCorruption(format!(
                "chain {chain}: stored head block {} disagrees with the accumulator",
                snapshot.head_block_num
            ))
            .into());
        }

        info!(
            "Restored chain {} at block {} ({} blocks, root {})",
            chain,
            snapshot.head_block_num,
            accumulator.leaf_count(),
            accumulator.root()
        );

        Ok(Self {
            chain,
            accumulator,
            first_block_num: snapshot.first_block_num,
            head: Some((snapshot.head_block_num, snapshot.head_id)),
            store,
        })
    }

    /// Append the next block of the chain and return the new accumulator root.
    ///
    /// The first header seeds the tracker. Every later header must carry the next block
    /// number and point at the current head.
    pub async fn update(&mut self, header: &BlockHeader) -> Result<Digest, RelayError> {
        let block_num = header.block_num();
        let id = header.id();

        if let Some((head_num, head_id)) = self.head {
            if head_num.checked_add(1) != Some(block_num) {
                return Err(RelayError::OutOfOrder {
                    chain: self.chain,
                    expected: head_num.wrapping_add(1),
                    got: block_num,
                });
            }
            if header.previous != head_id {
                return Err(RelayError::PreviousMismatch {
                    chain: self.chain,
                    block_num,
                    head_id,
                    previous: header.previous,
                });
            }
        }

        let mut accumulator = self.accumulator.clone();
        let root = accumulator.append(id)?;
        let first_block_num = match self.head {
            Some(_) => self.first_block_num,
            None => block_num,
        };

        let snapshot = ChainSnapshot {
            chain: self.chain,
            first_block_num,
            head_block_num: block_num,
            head_id: id,
            frontier: accumulator.encode(),
        };
        let record = BlockRecord {
            block_num,
            id,
            root,
            header: header.clone(),
        };
        self.store.append_block(&snapshot, &record).await?;

        self.accumulator = accumulator;
        self.first_block_num = first_block_num;
        self.head = Some((block_num, id));

        debug!("Chain {} advanced to block {}, root {}", self.chain, block_num, root);
        Ok(root)
    }

    pub fn chain(&self) -> Name {
        self.chain
    }

    /// Current accumulator root, the zero digest before the first block
    pub fn root(&self) -> Digest {
        self.accumulator.root()
    }

    /// Number and id of the last ingested block
    pub fn head(&self) -> Option<(u32, Digest)> {
        self.head
    }

    /// First ingested block, `None` before the first block
    pub fn first_block_num(&self) -> Option<u32> {
        self.head.map(|_| self.first_block_num)
    }

    pub fn accumulator(&self) -> &IncrementalMerkle {
        &self.accumulator
    }
}

/// Independent trackers keyed by peer chain, restored on first use
pub struct ChainTrackers {
    store: Arc<dyn TrackerStore>,
    trackers: HashMap<Name, ChainTracker>,
}

impl ChainTrackers {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self {
            store,
            trackers: HashMap::new(),
        }
    }

    pub async fn tracker(&mut self, chain: Name) -> Result<&mut ChainTracker, RelayError> {
        if !self.trackers.contains_key(&chain) {
            let tracker = ChainTracker::restore(self.store.clone(), chain).await?;
            self.trackers.insert(chain, tracker);
        }
        self.trackers
            .get_mut(&chain)
            .ok_or(RelayError::UnknownChain(chain))
    }

    /// Ingest the next header of `chain`
    pub async fn update(&mut self, chain: Name, header: &BlockHeader) -> Result<Digest, RelayError> {
        self.tracker(chain).await?.update(header).await
    }
}
