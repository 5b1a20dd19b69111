//! Staged mutations and commit modes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cirrus_types::{Key, Value};

/// How a commit request is applied by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitMode {
    /// Mutations are applied independently, outside any transaction.
    NonTransactional,
    /// Mutations are applied atomically under an open transaction.
    Transactional,
}

/// A single staged change to one record.
///
/// Mutations are applied by the server in the order they appear in a
/// commit request. For upserts with partial keys, that order also
/// determines which server-assigned id belongs to which record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Create or replace the record at `key`.
    Upsert {
        /// Target key. May be partial; the server assigns the missing id.
        key: Key,
        /// Property values at staging time.
        properties: BTreeMap<String, Value>,
    },
    /// Delete the record at `key`.
    Delete {
        /// Target key. Must be complete.
        key: Key,
    },
}

impl Mutation {
    /// Creates an upsert mutation.
    pub fn upsert(key: Key, properties: BTreeMap<String, Value>) -> Self {
        Self::Upsert { key, properties }
    }

    /// Creates a delete mutation.
    pub fn delete(key: Key) -> Self {
        Self::Delete { key }
    }

    /// Returns the target key.
    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            Self::Upsert { key, .. } | Self::Delete { key } => key,
        }
    }

    /// Returns `true` if this is an upsert.
    #[must_use]
    pub fn is_upsert(&self) -> bool {
        matches!(self, Self::Upsert { .. })
    }

    /// Returns `true` if this is an upsert whose key still awaits a
    /// server-assigned id.
    #[must_use]
    pub fn inserts_partial_key(&self) -> bool {
        match self {
            Self::Upsert { key, .. } => key.is_partial(),
            Self::Delete { .. } => false,
        }
    }
}
