//! Account addresses.
//!
//! An [`Address`] is 20 opaque bytes printed as `0x`-prefixed lowercase hex.
//! The ledger never interprets the bytes; the zero address stands for
//! "no account" (for example, an absent referrer).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// Byte length of an address.
pub const ADDRESS_LEN: usize = 20;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Deterministic address for a human-readable label.
    ///
    /// Takes the first 20 bytes of the BLAKE3 hash of the label. Used by
    /// the simulator and tests to name accounts.
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..ADDRESS_LEN]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        let raw = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(raw.len()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let addr = Address([0xab; ADDRESS_LEN]);
        let s = addr.to_string();
        assert_eq!(s, format!("0x{}", "ab".repeat(ADDRESS_LEN)));
        assert_eq!(s.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1; ADDRESS_LEN]).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!("abcd".parse::<Address>(), Err(AddressError::MissingPrefix));
        assert_eq!("0xabcd".parse::<Address>(), Err(AddressError::InvalidLength(2)));
        assert!(matches!("0xzz".parse::<Address>(), Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn labels_are_stable_and_distinct() {
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
        assert!(!Address::from_label("").is_zero());
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = Address::from_label("carol");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
