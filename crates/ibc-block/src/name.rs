//! Base-32 account names packed into a `u64`.
//!
//! Up to 13 characters from `.12345abcdefghijklmnopqrstuvwxyz`. The first 12 take 5 bits
//! each starting from the most significant end, the 13th takes the low 4 bits and is
//! therefore limited to `.1-5a-j`.

use std::fmt;
use std::str::FromStr;

use ibc_merkle::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BlockError;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_LEN: usize = 13;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(pub u64);

impl Name {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| BlockError::InvalidName {
            name: s.to_string(),
            reason,
        };
        if s.len() > MAX_LEN {
            return Err(invalid("longer than 13 characters"));
        }

        let mut value = 0u64;
        for (i, c) in s.bytes().enumerate() {
            let symbol = char_to_symbol(c).ok_or_else(|| invalid("character outside .1-5a-z"))?;
            if i < MAX_LEN - 1 {
                value |= symbol << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    return Err(invalid("13th character must be one of .1-5a-j"));
                }
                value |= symbol;
            }
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = [b'.'; MAX_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_LEN {
            let mask = if i == 0 { 0x0f } else { 0x1f };
            chars[MAX_LEN - 1 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= if i == 0 { 4 } else { 5 };
        }
        let len = chars.iter().rposition(|c| *c != b'.').map_or(0, |pos| pos + 1);
        // CHARMAP is ASCII
        f.write_str(std::str::from_utf8(&chars[..len]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl From<u64> for Name {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Pack for Name {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u64(self.0);
    }
}

impl Unpack for Name {
    const MIN_PACKED_SIZE: usize = 8;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self(reader.read_u64("name")?))
    }
}
