//! Credential strings that never show up in logs or debug output.

use crate::{ErrorLocation, RedactError};

use std::fmt;
use std::panic::Location;

use serde::de::{Deserialize, Deserializer};
use serde::ser::Error;
use zeroize::Zeroize;

/// An auth token (bootstrap, session or caller credential).
///
/// `Debug` and `Display` are redacted, the backing buffer is zeroized on
/// drop, and serde serialization is refused so a token cannot end up in a
/// config dump by accident. Deserialization is allowed: tokens arrive from
/// config files and the environment.
#[derive(Clone, Default)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// The raw token, for putting on the wire or comparing.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Token length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Exact comparison against a presented credential.
    ///
    /// An empty token never matches, so an unset credential cannot be
    /// satisfied by an empty request field.
    pub fn matches(&self, presented: &str) -> bool {
        !self.inner.is_empty() && self.inner == presented
    }
}

impl PartialEq for RedactedToken {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for RedactedToken {}

impl From<String> for RedactedToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for RedactedToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken([REDACTED; {} chars])", self.inner.len())
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl serde::Serialize for RedactedToken {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::Serialization {
            message: String::from("RedactedToken cannot be serialized - use as_str() explicitly"),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}

impl<'de> Deserialize<'de> for RedactedToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}
