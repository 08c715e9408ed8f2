//! The identifier and scalar primitives shared by the DEX subsystem, and the
//! canonical byte codec they serialize through.
//!
//! Everything in this crate is consensus-critical: the byte layout of these
//! types is fixed forever and any drift forks the chain. Keep the encoding
//! rules in [`codec`] and the frozen test vectors in sync.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod codec;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};
use sp_core::H256;
use sp_std::fmt;

/// Identifier of a registered DEX operator. Zero is the system DEX.
pub type DexId = u32;

/// The system-owned DEX. Its operator record is implicit.
pub const DEX_RESERVED_ID: DexId = 0;

/// A token amount in the token's minor unit ("sawi").
pub type Amount = u64;

/// A price in minor coin units per whole asset unit, scaled by [`PRICE_BOOST`].
pub type Price = u64;

/// Scaling factor between nominal price and on-chain integer price.
pub const PRICE_BOOST: u64 = 100_000_000;

/// Scaling factor for fee ratios. A ratio of `10^6` is 1%.
pub const RATIO_BOOST: u64 = 100_000_000;

/// Hash of a transaction. Doubles as the id of the order a transaction placed.
pub type TxId = H256;

/// The double-SHA256 used for every transaction signature hash.
pub fn double_sha256(data: &[u8]) -> TxId {
    let once = sp_core::hashing::sha2_256(data);
    TxId::from(sp_core::hashing::sha2_256(&once))
}

/// Coordinate of a confirmed transaction: block height plus index within the
/// block. This is the canonical ordering key of everything on chain; the
/// settlement engine uses it to decide which matched order is the taker.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxCord {
    pub height: u32,
    pub index: u16,
}

impl TxCord {
    pub const fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 && self.index == 0
    }

    pub fn set_empty(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for TxCord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

/// On-chain account identifier: the coordinate of the account-registering
/// transaction. `(0, 0)` is the empty sentinel.
///
/// Canonical encoding is 6 bytes: big-endian height then big-endian index.
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegId {
    pub height: u32,
    pub index: u16,
}

impl RegId {
    pub const EMPTY: RegId = RegId {
        height: 0,
        index: 0,
    };

    pub const fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn set_empty(&mut self) {
        *self = Self::EMPTY;
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

/// Longest ticker a [`TokenSymbol`] can hold.
pub const TOKEN_SYMBOL_MAX_LEN: usize = 7;

/// A ticker symbol: 1 to 7 ASCII characters, stored inline.
///
/// The charset rule (uppercase alphanumeric) is enforced by [`TokenSymbol::new`]
/// and checkable with [`TokenSymbol::is_well_formed`]; wire decoding only
/// bounds the length, leaving charset rejection to transaction validation so
/// that a malformed symbol is reported as an unknown symbol rather than a
/// codec failure.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TokenSymbol {
    len: u8,
    bytes: [u8; TOKEN_SYMBOL_MAX_LEN],
}

impl TokenSymbol {
    pub const MAX_LEN: usize = TOKEN_SYMBOL_MAX_LEN;

    /// Build a symbol from a well-formed ticker string.
    /// Returns `None` if the length or charset rule is violated.
    pub fn new(s: &str) -> Option<Self> {
        let symbol = Self::from_raw_bytes(s.as_bytes())?;
        if symbol.len == 0 || !symbol.is_well_formed() {
            return None;
        }
        Some(symbol)
    }

    /// Build a symbol from raw wire bytes, bounding only the length.
    pub fn from_raw_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > Self::MAX_LEN {
            return None;
        }
        let mut out = Self::default();
        out.len = bytes.len() as u8;
        out.bytes[..bytes.len()].copy_from_slice(bytes);
        Some(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn as_str(&self) -> &str {
        // Charset-checked symbols are ASCII; raw wire symbols may not be,
        // so fall back to an empty string rather than panicking.
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every character is uppercase ASCII alphanumeric and the
    /// length is in range.
    pub fn is_well_formed(&self) -> bool {
        self.len >= 1
            && self
                .as_bytes()
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }
}

impl PartialOrd for TokenSymbol {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenSymbol {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Debug for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TokenSymbol({})", self.as_str())
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl Serialize for TokenSymbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl<'de> Deserialize<'de> for TokenSymbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenSymbol::new(&s).ok_or_else(|| serde::de::Error::custom("malformed token symbol"))
    }
}
