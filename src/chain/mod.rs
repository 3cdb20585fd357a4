// Chain primitives: addresses, transaction hashes, chain ids.
//
// Addresses and hashes travel as `0x`-prefixed lowercase hex everywhere
// (config files, CLI arguments, the node API), so their serde form is the
// display string rather than a byte array.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::errors::AllowlistError;

/// A 20-byte participant or registry address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// Parse a `0x` address, or derive a dev account from any other name.
    ///
    /// Shared by `--account` and `ALLOWLIST_ACCOUNT`.
    pub fn parse_account(value: &str) -> Result<Self, AllowlistError> {
        if value.starts_with("0x") {
            value.parse()
        } else if value.is_empty() {
            Err(AllowlistError::InvalidAddress(String::new()))
        } else {
            Ok(Self::from_seed(value))
        }
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Deterministic address derived from an arbitrary seed string.
    ///
    /// Used for development accounts (`--account alice`) and tests.
    pub fn from_seed(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        Self::from_digest_tail(&digest)
    }

    /// Take the trailing 20 bytes of a 32-byte digest.
    pub(crate) fn from_digest_tail(digest: &[u8]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[digest.len() - 20..]);
        Self(bytes)
    }

    /// Short display prefix (`0x` + first 8 hex digits)
    pub fn short(&self) -> String {
        format!("0x{}", &hex::encode(self.0)[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AllowlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits).map_err(|_| AllowlistError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; 20] = raw
            .try_into()
            .map_err(|_| AllowlistError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AllowlistError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = AllowlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits).map_err(|_| AllowlistError::InvalidTxHash(s.to_string()))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| AllowlistError::InvalidTxHash(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for TxHash {
    type Error = AllowlistError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.to_string()
    }
}

/// Numeric network identifier reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_and_parse() {
        let addr = Address::from_seed("alice");
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_parse_without_prefix() {
        let addr: Address = "00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(addr.as_bytes()[19], 0xff);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err, AllowlistError::InvalidAddress("0x1234".to_string()));
    }

    #[test]
    fn test_address_rejects_non_hex() {
        assert!("0xzz00000000000000000000000000000000000000"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_address_serializes_as_string() {
        let addr = Address::from_seed("bob");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
    }

    #[test]
    fn test_seeded_addresses_differ() {
        assert_ne!(Address::from_seed("alice"), Address::from_seed("bob"));
        assert_eq!(Address::from_seed("alice"), Address::from_seed("alice"));
    }

    #[test]
    fn test_short_address() {
        let addr = Address::from_seed("carol");
        assert_eq!(addr.short().len(), 10);
        assert!(addr.to_string().starts_with(&addr.short()));
    }

    #[test]
    fn test_tx_hash_roundtrip_through_text() {
        let hash = TxHash::from_bytes([7u8; 32]);
        let parsed: TxHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        assert!("0x07".parse::<TxHash>().is_err());
    }

    #[test]
    fn test_chain_id_is_transparent() {
        assert_eq!(serde_json::to_string(&ChainId(80001)).unwrap(), "80001");
    }
}
