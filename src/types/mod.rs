use serde::{Deserialize, Serialize};
use std::fmt;

/// Row identifier of a debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebateId(pub u32);

/// Row identifier of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u32);

impl DebateId {
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Convert to the SQLite integer representation
    pub fn to_i64(self) -> i64 {
        i64::from(self.0)
    }

    /// Build from a SQLite rowid, rejecting zero and out-of-range values
    pub fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok().and_then(Self::new)
    }
}

impl ImageId {
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Convert to the SQLite integer representation
    pub fn to_i64(self) -> i64 {
        i64::from(self.0)
    }

    /// Build from a SQLite rowid, rejecting zero and out-of-range values
    pub fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok().and_then(Self::new)
    }
}

impl fmt::Display for DebateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
