//! Session identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// Dense, creation-ordered key of a voting session (0, 1, 2, ...).
///
/// Ids are handed out by the registry and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const FIRST: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Position of this session in the registry's dense table.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl FromStr for SessionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidSessionId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_ids() {
        assert_eq!("7".parse::<SessionId>().unwrap(), SessionId::new(7));
        assert_eq!(" 0 ".parse::<SessionId>().unwrap(), SessionId::FIRST);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        assert!(matches!(
            "abc".parse::<SessionId>(),
            Err(TypeError::InvalidSessionId(_))
        ));
        assert!("-1".parse::<SessionId>().is_err());
    }
}
