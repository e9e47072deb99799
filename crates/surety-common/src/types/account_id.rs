//! AccountId - 20-byte identity for every FlightSurety participant
//!
//! Airlines, passengers, oracles and the contracts themselves are all
//! identified the same way. The textual form is `0x` followed by 40
//! lowercase hex characters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of an identity in bytes
pub const ACCOUNT_ID_LEN: usize = 20;

/// Identity of a caller or contract
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId([u8; ACCOUNT_ID_LEN]);

/// Failure parsing an [`AccountId`] from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountIdParseError {
    #[error("Identity must be 0x followed by 40 hex characters")]
    InvalidLength,

    #[error("Invalid hex in identity: {0}")]
    InvalidHex(String),
}

impl AccountId {
    /// Wrap raw identity bytes
    pub const fn from_bytes(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a stable identity from a human-readable label
    ///
    /// Used by simulators and tests to get reproducible participants.
    ///
    /// # Example
    /// ```
    /// use surety_common::AccountId;
    ///
    /// let a = AccountId::from_label("JetFirst Airlines");
    /// assert_eq!(a, AccountId::from_label("JetFirst Airlines"));
    /// assert!(a.to_string().starts_with("0x"));
    /// ```
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..ACCOUNT_ID_LEN]);
        Self(bytes)
    }

    /// Raw identity bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Short form for log lines (`0x1234…abcd`)
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != ACCOUNT_ID_LEN * 2 {
            return Err(AccountIdParseError::InvalidLength);
        }

        let mut bytes = [0u8; ACCOUNT_ID_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AccountIdParseError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_roundtrip() {
        let id = AccountId::from_label("passenger-7");
        let text = id.to_string();
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<AccountId>().unwrap(), id);
    }

    #[test]
    fn test_parse_accepts_unprefixed() {
        let parsed: AccountId = "2779bc82a1af3658f1827adfb163bfc8c5d5205f".parse().unwrap();
        assert_eq!(
            parsed.to_string(),
            "0x2779bc82a1af3658f1827adfb163bfc8c5d5205f"
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<AccountId>(),
            Err(AccountIdParseError::InvalidLength)
        );
        assert!(matches!(
            "0xzz79bc82a1af3658f1827adfb163bfc8c5d5205f".parse::<AccountId>(),
            Err(AccountIdParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let id = AccountId::from_label("oracle");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_distinct_labels() {
        assert_ne!(AccountId::from_label("a"), AccountId::from_label("b"));
    }
}
