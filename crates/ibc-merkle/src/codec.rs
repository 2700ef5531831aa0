//! Deterministic pack codec for on-chain byte layouts.
//!
//! Fixed-width integers are little-endian. Every length prefix and variant index is an
//! unsigned LEB128 `varuint32`. Optional values carry a `0`/`1` tag byte.

use thiserror::Error;

/// Maximum number of bytes in a `varuint32`
const MAX_VARUINT32_BYTES: usize = 5;

/// Errors raised while decoding packed bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {field}")]
    UnexpectedEnd { field: &'static str },
    #[error("invalid varuint32 while reading {field}")]
    InvalidVarint { field: &'static str },
    #[error("length {len} of {field} exceeds the {remaining} remaining bytes")]
    InvalidLength {
        field: &'static str,
        len: usize,
        remaining: usize,
    },
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u64 },
    #[error("{remaining} trailing bytes after {record}")]
    TrailingBytes {
        record: &'static str,
        remaining: usize,
    },
}

/// Append-only byte buffer
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_varuint32(&mut self, mut value: u32) {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if value == 0 {
                break;
            }
        }
    }

    /// Writes raw bytes without a length prefix
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a length-prefixed byte vector
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_varuint32(len_prefix(bytes.len()));
        self.write_raw(bytes);
    }

    pub fn write<T: Pack + ?Sized>(&mut self, value: &T) {
        value.pack(self);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// Wire lengths are varuint32; anything longer cannot exist on chain.
fn len_prefix(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Cursor over packed bytes
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    pub fn read_exact(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEnd { field });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.bytes[start..start + len])
    }

    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_exact(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array(field)?))
    }

    pub fn read_varuint32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARUINT32_BYTES {
            let byte = self.read_u8(field)?;
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return u32::try_from(value).map_err(|_| DecodeError::InvalidVarint { field });
            }
        }
        Err(DecodeError::InvalidVarint { field })
    }

    /// Reads a length prefix and checks it against the remaining input.
    /// Every element takes at least `min_item_size` bytes.
    pub fn read_len(&mut self, field: &'static str, min_item_size: usize) -> Result<usize, DecodeError> {
        let len = self.read_varuint32(field)? as usize;
        let remaining = self.remaining();
        if len.saturating_mul(min_item_size) > remaining {
            return Err(DecodeError::InvalidLength {
                field,
                len,
                remaining,
            });
        }
        Ok(len)
    }

    /// Reads a length-prefixed byte vector
    pub fn read_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len(field, 1)?;
        Ok(self.read_exact(len, field)?.to_vec())
    }

    pub fn read<T: Unpack>(&mut self) -> Result<T, DecodeError> {
        T::unpack(self)
    }

    /// Fails if any input is left unread
    pub fn finish(&self, record: &'static str) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(DecodeError::TrailingBytes { record, remaining }),
        }
    }
}

/// Types with a fixed packed layout
pub trait Pack {
    fn pack(&self, writer: &mut Writer);

    fn to_packed(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.pack(&mut writer);
        writer.into_bytes()
    }
}

/// Types that can be read back from their packed layout
pub trait Unpack: Sized {
    /// Smallest number of bytes a packed value occupies, used to bound length prefixes
    const MIN_PACKED_SIZE: usize = 1;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError>;

    /// Decodes a complete record, rejecting trailing bytes
    fn from_packed(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let value = Self::unpack(&mut reader)?;
        reader.finish(std::any::type_name::<Self>())?;
        Ok(value)
    }
}

impl Pack for u8 {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u8(*self);
    }
}

impl Unpack for u8 {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_u8("u8")
    }
}

impl Pack for u16 {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u16(*self);
    }
}

impl Unpack for u16 {
    const MIN_PACKED_SIZE: usize = 2;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_u16("u16")
    }
}

impl Pack for u32 {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u32(*self);
    }
}

impl Unpack for u32 {
    const MIN_PACKED_SIZE: usize = 4;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_u32("u32")
    }
}

impl Pack for u64 {
    fn pack(&self, writer: &mut Writer) {
        writer.write_u64(*self);
    }
}

impl Unpack for u64 {
    const MIN_PACKED_SIZE: usize = 8;

    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        reader.read_u64("u64")
    }
}

impl<T: Pack> Pack for [T] {
    fn pack(&self, writer: &mut Writer) {
        writer.write_varuint32(len_prefix(self.len()));
        for item in self {
            item.pack(writer);
        }
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, writer: &mut Writer) {
        self.as_slice().pack(writer);
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = reader.read_len("sequence", T::MIN_PACKED_SIZE)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::unpack(reader)?);
        }
        Ok(items)
    }
}

impl<T: Pack> Pack for Option<T> {
    fn pack(&self, writer: &mut Writer) {
        match self {
            Some(value) => {
                writer.write_u8(1);
                value.pack(writer);
            }
            None => writer.write_u8(0),
        }
    }
}

impl<T: Unpack> Unpack for Option<T> {
    fn unpack(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match reader.read_u8("optional tag")? {
            0 => Ok(None),
            1 => Ok(Some(T::unpack(reader)?)),
            tag => Err(DecodeError::InvalidValue {
                field: "optional tag",
                value: u64::from(tag),
            }),
        }
    }
}
