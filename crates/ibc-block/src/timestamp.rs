use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use ibc_merkle::codec::{DecodeError, Pack, Reader, Unpack, Writer};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BlockError;

/// 2000-01-01T00:00:00Z in milliseconds since the Unix epoch
pub const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 946_684_800_000;
/// Block interval in milliseconds
pub const BLOCK_INTERVAL_MS: i64 = 500;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Block production slot: number of half seconds since 2000-01-01T00:00:00Z
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockTimestamp(pub u32);

impl BlockTimestamp {
    pub fn slot(&self) -> u32 {
        self.0
    }

    pub fn to_millis(&self) -> i64 {
        BLOCK_TIMESTAMP_EPOCH_MS + i64::from(self.0) * BLOCK_INTERVAL_MS
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        // Every u32 slot lies well inside chrono's range
        DateTime::from_timestamp_millis(self.to_millis()).unwrap_or_default()
    }

    /// Slot containing `datetime`, rounded down to the block interval
    pub fn from_datetime(datetime: DateTime<Utc>) -> Result<Self, BlockError> {
        let offset = datetime.timestamp_millis() - BLOCK_TIMESTAMP_EPOCH_MS;
        if offset < 0 {
            return Err(BlockError::InvalidTimestamp(format!(
                "{datetime} precedes the block timestamp epoch"
            )));
        }
        u32::try_from(offset / BLOCK_INTERVAL_MS)
            .map(Self)
            .map_err(|_| BlockError::InvalidTimestamp(format!("{datetime} is past the last slot")))
    }
}

impl fmt::Display for BlockTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format(FORMAT))
    }
}

impl FromStr for BlockTimestamp {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let naive = NaiveDateTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
            .map_err(|e| BlockError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Self::from_datetime(naive.and_utc())
    }
}

impl Serialize for BlockTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Pack for BlockTimestamp {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u32(self.0);
    }
}

impl Unpack for BlockTimestamp {
    const MIN_PACKED_SIZE: usize = 4;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self(reader.read_u32("timestamp")?))
    }
}
