//! Error taxonomy.
//!
//! - [`TransportError`]: a remote call or push channel failed.
//! - [`MutationError`]: what a mutation surfaces to its caller, after the
//!   cache has already been restored. Uniqueness conflicts are split out as
//!   [`ConflictError`] so the UI can show a specific message.
//! - [`PushEventError`]: a push notification could not be understood. These
//!   never leave the event invalidator.

use thiserror::Error;

/// Failure reported by the transport collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request never reached the server or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The transport gave up waiting.
    #[error("request timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed time before giving up.
        after_ms: u64,
    },

    /// The server answered with a non-success status.
    #[error("server returned {status} ({code}): {message}")]
    Status {
        /// HTTP status.
        status: u16,
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The server rejected the write because of a uniqueness constraint.
    #[error("conflict ({code}): {message}")]
    Conflict {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The push channel ended.
    #[error("push channel closed")]
    Closed,
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// A uniqueness conflict, e.g. a duplicate title.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConflictError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Failure of a mutation, surfaced after rollback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    /// The server rejected the write as a duplicate.
    #[error("conflict: {0}")]
    Conflict(ConflictError),

    /// Any other failure.
    #[error("mutation failed: {0}")]
    Failed(TransportError),
}

impl MutationError {
    /// Returns `true` for uniqueness conflicts.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<TransportError> for MutationError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Conflict { code, message } => {
                Self::Conflict(ConflictError { code, message })
            }
            other => Self::Failed(other),
        }
    }
}

/// A push notification that could not be turned into an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushEventError {
    /// The event type is not one this client understands.
    #[error("unknown push event type '{0}'")]
    UnknownType(String),

    /// The payload is missing a field or has the wrong shape.
    #[error("malformed payload for '{event_type}': {message}")]
    MalformedPayload {
        /// Event type.
        event_type: String,
        /// Decoder message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_conflict_is_routed_to_structured_variant() {
        let error = MutationError::from(TransportError::Conflict {
            code: "duplicate_title".to_string(),
            message: "a tag named work already exists".to_string(),
        });
        assert!(error.is_conflict());
        assert_eq!(
            error.to_string(),
            "conflict: a tag named work already exists"
        );
    }

    #[rstest]
    #[case(TransportError::Network("reset".to_string()))]
    #[case(TransportError::Timeout { after_ms: 30 })]
    #[case(TransportError::Closed)]
    fn test_other_failures_stay_generic(#[case] error: TransportError) {
        assert_eq!(MutationError::from(error.clone()), MutationError::Failed(error));
    }
}
