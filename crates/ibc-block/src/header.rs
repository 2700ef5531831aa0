//! Block header codec and block identity.
//!
//! A block id is the SHA-256 digest of the packed header with its first four bytes
//! replaced by the block number in big-endian order. Any holder of an id can read the
//! block number back without an index.

use ibc_merkle::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use ibc_merkle::Digest;
use serde::{Deserialize, Serialize};

use crate::error::BlockError;
use crate::name::Name;
use crate::schedule::{ProducerAuthoritySchedule, ProducerSchedule};
use crate::timestamp::BlockTimestamp;

/// Tagged opaque payload attached to a header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderExtension {
    pub id: u16,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub timestamp: BlockTimestamp,
    pub producer: Name,
    pub confirmed: u16,
    /// Id of the parent block
    pub previous: Digest,
    pub transaction_mroot: Digest,
    pub action_mroot: Digest,
    pub schedule_version: u32,
    #[serde(default)]
    pub new_producers: Option<ProducerSchedule>,
    #[serde(default)]
    pub header_extensions: Vec<HeaderExtension>,
}

impl BlockHeader {
    /// Block number embedded in the first four bytes of a block id
    pub fn num_from_id(id: &Digest) -> u32 {
        u32::from_be_bytes([id.0[0], id.0[1], id.0[2], id.0[3]])
    }

    pub fn block_num(&self) -> u32 {
        Self::num_from_id(&self.previous).wrapping_add(1)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_packed()
    }

    /// Decode a complete packed header, rejecting trailing bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, BlockError> {
        let mut reader = Reader::new(bytes);
        let header = Self::unpack(&mut reader)?;
        reader.finish("block header")?;
        Ok(header)
    }

    /// SHA-256 of the packed header
    pub fn digest(&self) -> Digest {
        Digest::hash(self.encode())
    }

    pub fn id(&self) -> Digest {
        let mut id = self.digest();
        id.0[..4].copy_from_slice(&self.block_num().to_be_bytes());
        id
    }

    /// Raw payload of the first extension tagged `extension_id`
    pub fn extension(&self, extension_id: u16) -> Option<&[u8]> {
        self.header_extensions
            .iter()
            .find(|ext| ext.id == extension_id)
            .map(|ext| ext.data.as_slice())
    }

    /// Producer schedule announced in the extension tagged `extension_id`, downgraded to
    /// one signing key per producer. `Ok(None)` when the header carries no such extension.
    pub fn schedule_change(&self, extension_id: u16) -> Result<Option<ProducerSchedule>, BlockError> {
        let Some(payload) = self.extension(extension_id) else {
            return Ok(None);
        };
        let schedule = ProducerAuthoritySchedule::from_packed(payload).map_err(|e| {
            BlockError::MalformedInput(format!(
                "extension {extension_id} is not a producer schedule: {e}"
            ))
        })?;
        schedule.downgrade().map(Some)
    }
}

impl Pack for HeaderExtension {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u16(self.id);
        writer.write_bytes(&self.data);
    }
}

impl Unpack for HeaderExtension {
    const MIN_PACKED_SIZE: usize = 3;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: reader.read_u16("extension id")?,
            data: reader.read_bytes("extension data")?,
        })
    }
}

impl Pack for BlockHeader {
    fn pack(&self, writer: &mut Writer) {
        writer.write(&self.timestamp);
        writer.write(&self.producer);
        writer.write_u16(self.confirmed);
        writer.write(&self.previous);
        writer.write(&self.transaction_mroot);
        writer.write(&self.action_mroot);
        writer.write_u32(self.schedule_version);
        writer.write(&self.new_producers);
        writer.write(&self.header_extensions);
    }
}

impl Unpack for BlockHeader {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            timestamp: reader.read()?,
            producer: reader.read()?,
            confirmed: reader.read_u16("confirmed")?,
            previous: reader.read()?,
            transaction_mroot: reader.read()?,
            action_mroot: reader.read()?,
            schedule_version: reader.read_u32("schedule_version")?,
            new_producers: reader.read()?,
            header_extensions: reader.read()?,
        })
    }
}

mod hex_bytes {
    use serde::{de::Error as DeError, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}
