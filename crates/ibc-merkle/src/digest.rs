//! 256-bit digest used for leaves, internal nodes and block ids.

use std::fmt;
use std::str::FromStr;

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use crate::error::MerkleError;

/// Digest size in bytes
pub const DIGEST_SIZE: usize = 32;

/// Opaque SHA-256 digest. The default value is the all-zero digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; DIGEST_SIZE]);

impl Digest {
    pub const ZERO: Digest = Digest([0u8; DIGEST_SIZE]);

    /// SHA-256 of the given bytes
    pub fn hash(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).into())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; DIGEST_SIZE]
    }

    /// Parse a 64-character hex string, with or without `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, MerkleError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| MerkleError::MalformedInput(format!("invalid digest hex: {e}")))?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = MerkleError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; DIGEST_SIZE] = bytes.try_into().map_err(|_| {
            MerkleError::MalformedInput(format!(
                "digest must be {DIGEST_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

impl Pack for Digest {
    fn pack(&self, writer: &mut Writer) {
        writer.write_raw(&self.0);
    }
}

impl Unpack for Digest {
    const MIN_PACKED_SIZE: usize = DIGEST_SIZE;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self(reader.read_array("digest")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Digest::hash(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hex_roundtrip_and_prefix() {
        let digest = Digest::hash(b"leaf");
        assert_eq!(Digest::from_hex(&digest.to_hex()).unwrap(), digest);
        assert_eq!(
            Digest::from_hex(&format!("0x{}", digest.to_hex())).unwrap(),
            digest
        );
        assert_eq!(digest.to_string().parse::<Digest>().unwrap(), digest);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            Digest::try_from(&[0u8; 31][..]),
            Err(MerkleError::MalformedInput(_))
        ));
        assert!(matches!(
            Digest::from_hex("abcd"),
            Err(MerkleError::MalformedInput(_))
        ));
        assert!(matches!(
            Digest::from_hex("zz"),
            Err(MerkleError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let digest = Digest([0xab; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<Digest>(&json).unwrap(), digest);
    }

    #[test]
    fn test_zero_default() {
        assert!(Digest::default().is_zero());
        assert_eq!(Digest::default(), Digest::ZERO);
        assert!(!Digest::hash(b"").is_zero());
    }
}
