//! Peer chain relay
//!
//! This crate tracks the finalized block headers of peer chains, keeps one accumulator of
//! block ids per chain in SQLite, and produces block inclusion proofs against those
//! accumulators.

pub mod config;
pub mod error;
pub mod prover;
pub mod store;
pub mod tracker;

pub use config::RelayConfig;
pub use error::RelayError;
pub use prover::{anchor_root, prove_block};
pub use store::{BlockRecord, ChainSnapshot, MemoryStore, SQLiteStore, StoreError, TrackerStore};
pub use tracker::{ChainTracker, ChainTrackers};
