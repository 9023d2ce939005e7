//! Crate-level error types for fetches, creates, and cache transitions.

use serde::Serialize;

use crate::resource::Phase;

/// A remote fetch failed (network or server error).
///
/// Never returned from a [`Orchestrator`](crate::Orchestrator) method.
/// It is captured as the `last_error` of the resource whose fetch failed, so
/// one failing resource cannot interrupt the fetches of the others.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("fetch failed: {message}")]
pub struct FetchError {
    /// Human-readable cause reported by the transport.
    pub message: String,
}

impl FetchError {
    /// Build a fetch error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A remote create, update or delete call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("remote write failed: {message}")]
pub struct RemoteError {
    /// Human-readable cause reported by the transport.
    pub message: String,
}

impl RemoteError {
    /// Build a remote error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A local check rejected a write before (or after) the remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ValidationError {
    /// The record or input has no usable name.
    #[error("name is required")]
    MissingName,

    /// A task input has no title.
    #[error("title is required")]
    MissingTitle,

    /// The email field is present but malformed.
    #[error("email address is invalid: {0}")]
    InvalidEmail(String),

    /// A deal amount is negative or not a finite number.
    #[error("amount must be a non-negative number")]
    InvalidAmount,

    /// The record returned by the server carries no identity.
    #[error("record has no identity")]
    MissingIdentity,

    /// No cached record has the given id.
    #[error("no record with id {0}")]
    UnknownRecord(String),
}

/// Error returned by the create, update and delete operations of an
/// [`Orchestrator`](crate::Orchestrator).
///
/// A write is a single user action with no partial-success meaning, so any
/// failure is surfaced to the caller and no cache is modified.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum WriteError {
    /// The input or the returned record failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The external write collaborator rejected the call.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The orchestrator task has exited.
    #[error("dashboard orchestrator is no longer running")]
    ActorGone,
}

/// Error returned by handle methods that cannot fail for domain reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// The orchestrator task has exited, so no further requests can be
    /// processed and no new snapshots will be published.
    #[error("dashboard orchestrator is no longer running")]
    ActorGone,
}

/// An illegal phase transition was requested on a
/// [`ResourceCache`](crate::ResourceCache).
///
/// This signals a programming-contract violation. The fetch coordinator's
/// guard makes it unreachable from the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {operation} while {phase}")]
pub struct CacheError {
    /// The cache operation that was attempted.
    pub operation: &'static str,
    /// The phase the cache was in at the time.
    pub phase: Phase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_includes_message() {
        let err = FetchError::new("connection reset");
        assert_eq!(err.to_string(), "fetch failed: connection reset");
    }

    #[test]
    fn create_error_wraps_validation() {
        let err = WriteError::from(ValidationError::MissingName);
        assert_eq!(err.to_string(), "validation error: name is required");
    }

    #[test]
    fn create_error_remote_is_transparent() {
        let err = WriteError::from(RemoteError::new("503"));
        assert_eq!(err.to_string(), "remote write failed: 503");
    }

    #[test]
    fn unknown_record_names_the_id() {
        let err = WriteError::from(ValidationError::UnknownRecord("42".into()));
        assert_eq!(err.to_string(), "validation error: no record with id 42");
    }

    #[test]
    fn cache_error_names_operation_and_phase() {
        let err = CacheError {
            operation: "begin_load",
            phase: Phase::Loading,
        };
        assert_eq!(err.to_string(), "cannot begin_load while loading");
    }

    #[test]
    fn create_error_serializes_with_kind_tag() {
        let err = WriteError::from(RemoteError::new("timeout"));
        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["kind"], "Remote");
        assert_eq!(json["message"]["message"], "timeout");
    }

    // Errors cross task boundaries through oneshot replies.
    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<WriteError>();
            assert_send_sync::<OrchestratorError>();
            assert_send_sync::<FetchError>();
        }
    };
}
