//! Error types for the Cirrus client.

use thiserror::Error;

use cirrus_types::KeyError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Operation not permitted in the unit of work's current state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the violated state requirement.
        message: String,
    },

    /// An entity was staged without a key.
    #[error("entity has no key")]
    MissingKey,

    /// A key was missing a required identifier.
    #[error("incomplete key: {key}")]
    IncompleteKey {
        /// Display form of the offending key.
        key: String,
    },

    /// A staged key belongs to a different project than the client.
    #[error("key project {actual} does not match client project {expected}")]
    ProjectMismatch {
        /// Project the client is bound to.
        expected: String,
        /// Project found on the key.
        actual: String,
    },

    /// Network or transport failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message from the transport.
        message: String,
    },

    /// The server rejected the request.
    #[error("service error: {message}")]
    ServiceFault {
        /// Error message from the server.
        message: String,
    },

    /// The server's response did not match the request it answered.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the mismatch.
        message: String,
    },

    /// Polled a long-running operation that already finished.
    #[error("operation has already completed")]
    OperationAlreadyComplete,

    /// Registered a second metadata decoder for one type URL.
    #[error("decoder already registered for {type_url}")]
    DuplicateDecoder {
        /// The conflicting type URL.
        type_url: String,
    },

    /// Key construction or completion error.
    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

impl ClientError {
    /// Creates an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an incomplete-key error.
    pub fn incomplete_key(key: impl ToString) -> Self {
        Self::IncompleteKey {
            key: key.to_string(),
        }
    }

    /// Creates a project-mismatch error.
    pub fn project_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ProjectMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a service-fault error.
    pub fn service_fault(message: impl Into<String>) -> Self {
        Self::ServiceFault {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns true if this is a local state or staging violation, raised
    /// before any RPC was attempted.
    #[must_use]
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. }
                | Self::MissingKey
                | Self::IncompleteKey { .. }
                | Self::ProjectMismatch { .. }
        )
    }

    /// Returns true if this error came from the transport or the server.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ServiceFault { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_violations_are_local() {
        assert!(ClientError::invalid_state("already begun").is_state_violation());
        assert!(ClientError::MissingKey.is_state_violation());
        assert!(!ClientError::transport("connection reset").is_state_violation());
    }

    #[test]
    fn remote_errors() {
        assert!(ClientError::transport("connection reset").is_remote());
        assert!(ClientError::service_fault("permission denied").is_remote());
        assert!(!ClientError::invalid_state("no transaction").is_remote());
        assert!(!ClientError::protocol("result count mismatch").is_remote());
    }

    #[test]
    fn error_display() {
        let err = ClientError::project_mismatch("proj-a", "proj-b");
        assert!(err.to_string().contains("proj-a"));
        assert!(err.to_string().contains("proj-b"));

        let err = ClientError::OperationAlreadyComplete;
        assert_eq!(err.to_string(), "operation has already completed");
    }
}
