//! The canonical byte codec every DEX entity serializes through.
//!
//! The rules are small and fixed:
//! * integers wider than a byte are `VARINT`: base-128 big-endian, the high
//!   bit set on every byte but the last, minimal length;
//! * byte strings are a `VARINT` length followed by the raw bytes;
//! * vectors are a `VARINT` count followed by the elements;
//! * optionals are a presence byte (0 or 1) followed by the value;
//! * `TxId` is 32 raw bytes, `RegId` is 6 (big-endian height then index).
//!
//! Decoding is strict: a `VARINT` with a redundant leading byte, an unknown
//! enum discriminant, or an oversized count is an error, never a lenient
//! re-interpretation. Two distinct byte strings never decode to the same
//! value.

use crate::{RegId, TokenSymbol, TxCord, TxId};
use sp_std::vec::Vec;

/// Ceiling on any decoded vector count or byte-string length.
pub const MAX_VEC_LEN: usize = 64 * 1024;

/// Ways a byte stream can fail to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The stream ended before the value was complete.
    Truncated,
    /// A `VARINT` carried a redundant leading byte or overflowed its target
    /// width.
    NonCanonicalVarInt,
    /// A vector count or byte-string length exceeded the configured ceiling.
    OversizeVec,
    /// An enum discriminant byte had no corresponding variant.
    UnknownEnum,
}

/// A borrowing cursor over an input byte stream.
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        let (&first, rest) = self.data.split_first().ok_or(CodecError::Truncated)?;
        self.data = rest;
        Ok(first)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.data.len() < n {
            return Err(CodecError::Truncated);
        }
        let (head, rest) = self.data.split_at(n);
        self.data = rest;
        Ok(head)
    }
}

/// Append the canonical `VARINT` form of `value`.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    // Big-endian 7-bit groups, minimal length.
    let mut groups = [0u8; 10];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7f) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

/// Read a canonical `VARINT`, rejecting redundant leading bytes and values
/// that do not fit a `u64`.
pub fn read_varint(input: &mut Reader) -> Result<u64, CodecError> {
    let mut value: u64 = 0;
    for i in 0..10 {
        let byte = input.read_byte()?;
        if i == 0 && byte == 0x80 {
            // A leading zero group never appears in a minimal encoding.
            return Err(CodecError::NonCanonicalVarInt);
        }
        if value > u64::MAX >> 7 {
            // The next shift would drop the accumulated high bits.
            return Err(CodecError::NonCanonicalVarInt);
        }
        value = (value << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::NonCanonicalVarInt)
}

/// Canonical serialization into a byte stream.
pub trait Encode {
    fn encode_to(&self, out: &mut Vec<u8>);

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

/// Canonical deserialization from a byte stream.
pub trait Decode: Sized {
    fn decode(input: &mut Reader) -> Result<Self, CodecError>;
}

/// Decode a value from the start of `bytes`.
pub fn decode_all<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut input = Reader::new(bytes);
    T::decode(&mut input)
}

impl Encode for u8 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decode for u8 {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        input.read_byte()
    }
}

impl Encode for u16 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_varint(out, u64::from(*self));
    }
}

impl Decode for u16 {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        u16::try_from(read_varint(input)?).map_err(|_| CodecError::NonCanonicalVarInt)
    }
}

impl Encode for u32 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_varint(out, u64::from(*self));
    }
}

impl Decode for u32 {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        u32::try_from(read_varint(input)?).map_err(|_| CodecError::NonCanonicalVarInt)
    }
}

impl Encode for u64 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_varint(out, *self);
    }
}

impl Decode for u64 {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        read_varint(input)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_varint(out, self.len() as u64);
        for item in self {
            item.encode_to(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        let count = read_varint(input)?;
        let count = usize::try_from(count).map_err(|_| CodecError::OversizeVec)?;
        if count > MAX_VEC_LEN {
            return Err(CodecError::OversizeVec);
        }
        // Every element takes at least one byte, so a count beyond the
        // remaining input can only be garbage.
        if count > input.remaining() {
            return Err(CodecError::Truncated);
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            None => out.push(0),
            Some(value) => {
                out.push(1);
                value.encode_to(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        match input.read_byte()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(input)?)),
            _ => Err(CodecError::UnknownEnum),
        }
    }
}

impl Encode for TxId {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for TxId {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        Ok(TxId::from_slice(input.read_bytes(32)?))
    }
}

impl Encode for RegId {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.index.to_be_bytes());
    }
}

impl Decode for RegId {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        let bytes = input.read_bytes(6)?;
        let height = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let index = u16::from_be_bytes([bytes[4], bytes[5]]);
        Ok(RegId { height, index })
    }
}

impl Encode for TxCord {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.height.encode_to(out);
        self.index.encode_to(out);
    }
}

impl Decode for TxCord {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        Ok(TxCord {
            height: u32::decode(input)?,
            index: u16::decode(input)?,
        })
    }
}

impl Encode for TokenSymbol {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_varint(out, self.as_bytes().len() as u64);
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for TokenSymbol {
    fn decode(input: &mut Reader) -> Result<Self, CodecError> {
        let len = read_varint(input)?;
        let len = usize::try_from(len).map_err(|_| CodecError::OversizeVec)?;
        if len > TokenSymbol::MAX_LEN {
            return Err(CodecError::OversizeVec);
        }
        let bytes = input.read_bytes(len)?;
        TokenSymbol::from_raw_bytes(bytes).ok_or(CodecError::OversizeVec)
    }
}
