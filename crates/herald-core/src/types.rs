//! Strong type definitions for Herald.
//!
//! Account identifiers and keys are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// Block height (or any externally supplied, non-decreasing counter).
pub type Height = u64;

/// Stable-asset amount in 18-decimal fixed point.
pub type Amount = u128;

/// A 20-byte account address.
///
/// Channels are keyed by their owner's address; subscribers by their own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address. Owns the system alert channel.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive the address controlled by a public key.
    ///
    /// The address is the trailing 20 bytes of the key's Blake3 digest.
    pub fn derive(public_key: &PublicKey) -> Self {
        Self::from_digest(blake3::hash(&public_key.0).as_bytes())
    }

    /// Derive a well-known address from a label, e.g. protocol accounts.
    pub fn from_label(label: &str) -> Self {
        Self::from_digest(blake3::hash(label.as_bytes()).as_bytes())
    }

    fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    /// Whether this is the null address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        let arr: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength {
                expected: 20,
                got: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte public key broadcast by a subscriber for encrypted notifications.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Create a public key from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_bytes([0x42; 20]);
        let recovered: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, recovered);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = Address::from_hex("0xabcd").unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidLength {
                expected: 20,
                got: 2
            }
        );
    }

    #[test]
    fn test_derive_is_deterministic() {
        let pk = PublicKey::from_bytes([0x07; 32]);
        assert_eq!(Address::derive(&pk), Address::derive(&pk));
        assert_ne!(Address::derive(&pk), Address::ZERO);
        assert_ne!(
            Address::derive(&pk),
            Address::derive(&PublicKey::from_bytes([0x08; 32]))
        );
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_label("herald.admin").is_zero());
        assert_eq!(
            Address::ZERO.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
    }
}
