//! Record identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of a record identifier in hex characters.
pub const RECORD_ID_LEN: usize = 24;

/// Identifier of a persisted record: 24 lowercase hex characters.
///
/// Built from the first 12 bytes of a UUIDv7, so identifiers created in the
/// same process sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid record id '{0}': expected {RECORD_ID_LEN} lowercase hex characters")]
pub struct InvalidId(pub String);

impl RecordId {
    pub fn new() -> Self {
        let bytes = Uuid::now_v7().into_bytes();
        Self(hex::encode(&bytes[..RECORD_ID_LEN / 2]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `s` has the shape of a record identifier.
    pub fn is_valid(s: &str) -> bool {
        s.len() == RECORD_ID_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidId(s.to_string()))
        }
    }
}

impl TryFrom<String> for RecordId {
    type Error = InvalidId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidId(value))
        }
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}
