//! Status messages for long-running server operations.

use serde::{Deserialize, Serialize};

/// A type-erased metadata blob attached to an operation status.
///
/// `type_url` names the concrete metadata type; `value` is its encoded
/// form. Decoding is handled by a metadata registry on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyPayload {
    /// Fully qualified type URL of the payload.
    pub type_url: String,
    /// Encoded payload bytes.
    pub value: Vec<u8>,
}

impl AnyPayload {
    /// Creates a new payload.
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }
}

/// Snapshot of a long-running server operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    /// Server-assigned operation name.
    pub name: String,
    /// Whether the operation has finished.
    pub done: bool,
    /// Progress metadata, if the server attached any.
    pub metadata: Option<AnyPayload>,
}

impl OperationStatus {
    /// Creates a status for an operation still in progress.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            metadata: None,
        }
    }

    /// Creates a status for a finished operation.
    pub fn done(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            metadata: None,
        }
    }

    /// Attaches metadata to this status.
    #[must_use]
    pub fn with_metadata(mut self, metadata: AnyPayload) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Fetches the current status of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOperationRequest {
    /// Name of the operation to fetch.
    pub name: String,
}

impl GetOperationRequest {
    /// Creates a new get-operation request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
