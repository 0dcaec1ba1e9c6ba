//! Slot identifiers and credential kinds.

use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::error::StorageError;

/// First object identifier of the retired key management range.
const RETIRED_FIRST: u8 = 0x82;
/// Last object identifier of the retired key management range.
const RETIRED_LAST: u8 = 0x95;

/// Identifies one fixed-capacity storage unit on the hardware token.
///
/// Slots are addressed by their one-byte key reference. The token exposes
/// twenty "retired key management" slots (`0x82..=0x95`) which nothing else
/// uses, so they are the default data slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u8);

impl SlotId {
    /// Creates a slot identifier from its raw key reference.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw key reference.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns `true` if this is one of the retired key management slots.
    #[must_use]
    pub const fn is_retired(self) -> bool {
        self.0 >= RETIRED_FIRST && self.0 <= RETIRED_LAST
    }

    /// Returns the retired slot with the given 1-based index, if it exists.
    #[must_use]
    pub const fn retired(index: u8) -> Option<Self> {
        if index == 0 || index > RETIRED_LAST - RETIRED_FIRST + 1 {
            None
        } else {
            Some(Self(RETIRED_FIRST + index - 1))
        }
    }

    /// Returns all retired key management slots in order.
    #[must_use]
    pub fn all_retired() -> Vec<Self> {
        (RETIRED_FIRST..=RETIRED_LAST).map(Self).collect()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_retired() {
            write!(f, "RETIRED{}", self.0 - RETIRED_FIRST + 1)
        } else {
            write!(f, "0x{:02X}", self.0)
        }
    }
}

impl FromStr for SlotId {
    type Err = StorageError;

    /// Parses either `RETIREDn` or a hexadecimal key reference such as `0x9a`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some(index) = upper.strip_prefix("RETIRED") {
            return index
                .parse::<u8>()
                .ok()
                .and_then(Self::retired)
                .ok_or_else(|| StorageError::invalid_slot(s));
        }
        let hex = upper.strip_prefix("0X").unwrap_or(&upper);
        u8::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| StorageError::invalid_slot(s))
    }
}

/// Kind of credential used to authenticate the privileged write channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CredentialType {
    /// Triple-DES management key (24 bytes). Factory default.
    #[default]
    Tdes,
    /// AES-128 management key (16 bytes).
    Aes128,
    /// AES-192 management key (24 bytes).
    Aes192,
    /// AES-256 management key (32 bytes).
    Aes256,
}

impl CredentialType {
    /// Returns the expected credential length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Tdes | Self::Aes192 => 24,
            Self::Aes128 => 16,
            Self::Aes256 => 32,
        }
    }

    /// Returns the canonical name of this credential type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tdes => "TDES",
            Self::Aes128 => "AES128",
            Self::Aes192 => "AES192",
            Self::Aes256 => "AES256",
        }
    }

    /// Checks a presented management key against the stored one.
    ///
    /// The key bytes are compared in constant time.
    #[must_use]
    pub fn accepts(self, expected: &[u8], presented: &[u8], presented_type: Self) -> bool {
        let key_matches: bool = presented.ct_eq(expected).into();
        key_matches & (presented_type == self)
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CredentialType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TDES" => Ok(Self::Tdes),
            "AES128" => Ok(Self::Aes128),
            "AES192" => Ok(Self::Aes192),
            "AES256" => Ok(Self::Aes256),
            _ => Err(StorageError::device(format!(
                "unknown credential type: {s}"
            ))),
        }
    }
}
