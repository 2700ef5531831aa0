//! Producer schedules, both the legacy single-key form and the weighted authority form
//! announced through header extensions.

use ibc_merkle::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use serde::{Deserialize, Serialize};

use crate::error::BlockError;
use crate::key::PublicKey;
use crate::name::Name;

/// Header extension id carrying a [`ProducerAuthoritySchedule`]
pub const PRODUCER_SCHEDULE_CHANGE_EXTENSION_ID: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerKey {
    pub producer_name: Name,
    pub block_signing_key: PublicKey,
}

/// Legacy producer schedule: one signing key per producer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSchedule {
    pub version: u32,
    pub producers: Vec<ProducerKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: PublicKey,
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSigningAuthority {
    V0 { threshold: u32, keys: Vec<KeyWeight> },
}

impl BlockSigningAuthority {
    /// First listed key, used when a single signing key is required
    pub fn primary_key(&self) -> Option<&PublicKey> {
        match self {
            BlockSigningAuthority::V0 { keys, .. } => keys.first().map(|kw| &kw.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerAuthority {
    pub producer_name: Name,
    pub authority: BlockSigningAuthority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerAuthoritySchedule {
    pub version: u32,
    pub producers: Vec<ProducerAuthority>,
}

impl ProducerAuthoritySchedule {
    /// Convert to the legacy form, keeping the primary key of every producer
    pub fn downgrade(&self) -> Result<ProducerSchedule, BlockError> {
        let producers = self
            .producers
            .iter()
            .map(|p| {
                let key = p.authority.primary_key().ok_or_else(|| {
                    BlockError::MalformedInput(format!(
                        "producer {} has no signing keys",
                        p.producer_name
                    ))
                })?;
                Ok(ProducerKey {
                    producer_name: p.producer_name,
                    block_signing_key: *key,
                })
            })
            .collect::<Result<Vec<_>, BlockError>>()?;
        Ok(ProducerSchedule {
            version: self.version,
            producers,
        })
    }
}

impl Pack for ProducerKey {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.producer_name);
        writer.write(&self.block_signing_key);
    }
}

impl Unpack for ProducerKey {
    const MIN_PACKED_SIZE: usize = 8 + PublicKey::MIN_PACKED_SIZE;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            producer_name: reader.read()?,
            block_signing_key: reader.read()?,
        })
    }
}

impl Pack for ProducerSchedule {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u32(self.version);
        writer.write(&self.producers);
    }
}

impl Unpack for ProducerSchedule {
    const MIN_PACKED_SIZE: usize = 5;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            version: reader.read_u32("schedule version")?,
            producers: reader.read()?,
        })
    }
}

impl Pack for KeyWeight {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.key);
        writer.write_u16(self.weight);
    }
}

impl Unpack for KeyWeight {
    const MIN_PACKED_SIZE: usize = PublicKey::MIN_PACKED_SIZE + 2;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            key: reader.read()?,
            weight: reader.read_u16("key weight")?,
        })
    }
}

impl Pack for BlockSigningAuthority {
    fn pack(&self, writer: &mut Writer) {
        match self {
            BlockSigningAuthority::V0 { threshold, keys } => {
                writer.write_varuint32(0);
                writer.write_u32(*threshold);
                writer.write(keys);
            }
        }
    }
}

impl Unpack for BlockSigningAuthority {
    const MIN_PACKED_SIZE: usize = 6;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match reader.read_varuint32("signing authority variant")? {
            0 => Ok(BlockSigningAuthority::V0 {
                threshold: reader.read_u32("threshold")?,
                keys: reader.read()?,
            }),
            other => Err(DecodeError::InvalidValue {
                field: "signing authority variant",
                value: u64::from(other),
            }),
        }
    }
}

impl Pack for ProducerAuthority {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.producer_name);
        writer.write(&self.authority);
    }
}

impl Unpack for ProducerAuthority {
    const MIN_PACKED_SIZE: usize = 8 + BlockSigningAuthority::MIN_PACKED_SIZE;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            producer_name: reader.read()?,
            authority: reader.read()?,
        })
    }
}

impl Pack for ProducerAuthoritySchedule {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u32(self.version);
        writer.write(&self.producers);
    }
}

impl Unpack for ProducerAuthoritySchedule {
    const MIN_PACKED_SIZE: usize = 5;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            version: reader.read_u32("schedule version")?,
            producers: reader.read()?,
        })
    }
}
