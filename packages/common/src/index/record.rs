use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ContentHash;

/// Identity of an authenticated caller, as handed to the engine by the
/// adapter. The engine only compares principals for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Principal {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Metadata for one piece of stored content.
///
/// Created once, by the first successful upload of the content, and never
/// mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub hash: ContentHash,
    /// Filename supplied by the first uploader.
    pub filename: String,
    pub owner: Principal,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn new(
        hash: ContentHash,
        filename: impl Into<String>,
        owner: Principal,
        size: u64,
    ) -> Self {
        Self {
            hash,
            filename: filename.into(),
            owner,
            size,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        &self.owner == principal
    }
}
