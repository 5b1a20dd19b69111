//! Error types for key construction and completion.

use thiserror::Error;

/// Errors that can occur when building or completing a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key has no path elements.
    #[error("key has an empty path")]
    EmptyPath,

    /// Attempted to complete a key that already has a final identifier.
    #[error("key is already complete: {kind}")]
    AlreadyComplete {
        /// Kind of the final path element.
        kind: String,
    },
}

impl KeyError {
    /// Creates an already-complete error for the given kind.
    pub fn already_complete(kind: impl Into<String>) -> Self {
        Self::AlreadyComplete { kind: kind.into() }
    }
}
