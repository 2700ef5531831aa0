//! Producer public keys.
//!
//! Keys are carried as opaque compressed points. Only their packed layout matters here,
//! no signature is ever checked against them.

use std::fmt;
use std::str::FromStr;

use ibc_merkle::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BlockError;

/// Size of a compressed secp256k1 / secp256r1 point
pub const PUBLIC_KEY_SIZE: usize = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    K1,
    R1,
}

impl KeyType {
    fn index(self) -> u32 {
        match self {
            KeyType::K1 => 0,
            KeyType::R1 => 1,
        }
    }

    fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(KeyType::K1),
            1 => Some(KeyType::R1),
            _ => None,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            KeyType::K1 => "K1",
            KeyType::R1 => "R1",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    pub kind: KeyType,
    pub data: [u8; PUBLIC_KEY_SIZE],
}

impl PublicKey {
    pub fn new(kind: KeyType, data: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self { kind, data }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), hex::encode(self.data))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = BlockError;

    /// Parses `K1:<66 hex chars>` or `R1:<66 hex chars>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, data) = s
            .split_once(':')
            .ok_or_else(|| BlockError::MalformedInput(format!("public key {s:?} has no type prefix")))?;
        let kind = match prefix {
            "K1" => KeyType::K1,
            "R1" => KeyType::R1,
            other => {
                return Err(BlockError::MalformedInput(format!(
                    "unsupported key type {other:?}"
                )))
            }
        };
        let bytes = hex::decode(data)
            .map_err(|e| BlockError::MalformedInput(format!("invalid public key hex: {e}")))?;
        let data = bytes.try_into().map_err(|bytes: Vec<u8>| {
            BlockError::MalformedInput(format!(
                "public key must be {PUBLIC_KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { kind, data })
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Pack for PublicKey {
    fn pack(&self, writer: &mut Writer) {
        writer.write_varuint32(self.kind.index());
        writer.write_raw(&self.data);
    }
}

impl Unpack for PublicKey {
    const MIN_PACKED_SIZE: usize = 1 + PUBLIC_KEY_SIZE;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let index = reader.read_varuint32("public key type")?;
        let kind = KeyType::from_index(index).ok_or(DecodeError::InvalidValue {
            field: "public key type",
            value: u64::from(index),
        })?;
        let data = reader.read_array("public key data")?;
        Ok(Self { kind, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PublicKey {
        let mut data = [0u8; PUBLIC_KEY_SIZE];
        data[0] = 0x02;
        data[32] = 0xee;
        PublicKey::new(KeyType::K1, data)
    }

    #[test]
    fn test_pack_layout() {
        let packed = key().to_packed();
        assert_eq!(packed.len(), 34);
        assert_eq!(packed[0], 0);
        assert_eq!(packed[1], 0x02);
        assert_eq!(PublicKey::from_packed(&packed).unwrap(), key());
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let mut packed = key().to_packed();
        packed[0] = 2;
        assert!(matches!(
            PublicKey::from_packed(&packed),
            Err(DecodeError::InvalidValue { value: 2, .. })
        ));
    }

    #[test]
    fn test_text_form() {
        let text = key().to_string();
        assert!(text.starts_with("K1:02"));
        assert_eq!(text.parse::<PublicKey>().unwrap(), key());
        assert!("WA:00".parse::<PublicKey>().is_err());
        assert!("K1:0202".parse::<PublicKey>().is_err());
        assert!("deadbeef".parse::<PublicKey>().is_err());
    }
}
