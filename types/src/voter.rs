//! Voter identity type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// An opaque caller identity, supplied by the external identity source
/// (e.g. an authenticated wallet address).
///
/// The registry trusts it to be stable and unforgeable for the lifetime of a
/// session; it performs no sybil checks of its own.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
    /// Create a voter identity from a raw string, kept verbatim.
    /// Only blank (empty or whitespace-only) strings are refused.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TypeError::EmptyIdentity);
        }
        Ok(Self(raw))
    }

    /// Return the raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for VoterId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<VoterId> for String {
    fn from(id: VoterId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identity_rejected() {
        assert_eq!(VoterId::new(""), Err(TypeError::EmptyIdentity));
        assert_eq!(VoterId::new("   "), Err(TypeError::EmptyIdentity));
    }

    #[test]
    fn identity_is_kept_verbatim() {
        let padded = VoterId::new(" alice").unwrap();
        assert_eq!(padded.as_str(), " alice");
        assert_ne!(padded, VoterId::new("alice").unwrap());
    }

    #[test]
    fn serde_rejects_empty_identity() {
        let bytes = bincode::serialize(&String::new()).unwrap();
        assert!(bincode::deserialize::<VoterId>(&bytes).is_err());
    }
}
