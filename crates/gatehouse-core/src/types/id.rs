//! Opaque session handle type.
//!
//! A [`SessionId`] wraps a random v4 [`uuid::Uuid`] (122 random bits) and is
//! the only thing a client ever carries. It is rendered in the standard
//! hyphenated form and parsed back with [`FromStr`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of leading characters kept by [`SessionId::redacted`].
const REDACTED_LEN: usize = 8;

/// Unguessable identifier for a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return a reference to the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short prefix of the handle, safe to put in log lines.
    pub fn redacted(&self) -> String {
        let mut s = self.0.to_string();
        s.truncate(REDACTED_LEN);
        s
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
