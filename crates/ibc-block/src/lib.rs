//! Peer chain block headers and block identity
//!
//! Headers are packed in their on-chain field order, hashed with SHA-256 and turned into
//! block ids that embed the block number in their first four bytes. Producer schedule
//! changes carried in header extensions are decoded on demand.

pub mod error;
pub mod header;
pub mod key;
pub mod name;
pub mod schedule;
pub mod timestamp;

pub use error::BlockError;
pub use header::{BlockHeader, HeaderExtension};
pub use key::{KeyType, PublicKey};
pub use name::Name;
pub use schedule::{
    BlockSigningAuthority, KeyWeight, ProducerAuthority, ProducerAuthoritySchedule, ProducerKey,
    ProducerSchedule, PRODUCER_SCHEDULE_CHANGE_EXTENSION_ID,
};
pub use timestamp::BlockTimestamp;
