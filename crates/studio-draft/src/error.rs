//! Error types for the draft engine
//!
//! Two layers:
//! - [`PersistenceError`] is what a Persistence Gateway reports for a failed call
//! - [`EngineError`] is what the panel controller returns to its caller
//!
//! Most gateway failures never reach the caller. The controller catches them
//! at the call site and turns them into notifications; only a failed delete
//! is returned, because its confirmation dialog stays open for a retry.

/// Failure reported by a Persistence Gateway call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// Transport-level failure (connection refused, timeout, reset)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        /// HTTP-style status code
        status: u16,
        /// Server-provided message, if any
        message: String,
    },

    /// Target entity does not exist on the server
    #[error("not found: {0}")]
    NotFound(String),

    /// Request or response body could not be encoded/decoded
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Call did not finish within its time bound
    #[error("timed out after {after_ms}ms")]
    Timeout {
        /// Bound that elapsed
        after_ms: u64,
    },
}

impl PersistenceError {
    /// Check if repeating the same call could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::NotFound(_) | Self::InvalidPayload(_) => false,
        }
    }

    /// Build a rejection error
    #[inline]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Gateway call failed
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Draft was deleted; no further transitions are evaluated
    #[error("draft has been retired")]
    Retired,

    /// Panel has already been closed
    #[error("panel is closed")]
    Closed,

    /// `confirm_delete` called without an open confirmation
    #[error("no delete confirmation is pending")]
    NoPendingConfirmation,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        assert!(PersistenceError::Network("reset".into()).is_retryable());
        assert!(PersistenceError::rejected(503, "busy").is_retryable());
        assert!(PersistenceError::rejected(429, "slow down").is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!PersistenceError::rejected(422, "title required").is_retryable());
        assert!(!PersistenceError::NotFound("task 9".into()).is_retryable());
    }

    #[test]
    fn engine_error_wraps_persistence() {
        let err: EngineError = PersistenceError::Network("down".into()).into();
        assert!(matches!(err, EngineError::Persistence(ref e) if e.is_retryable()));
        assert_eq!(err.to_string(), "persistence failed: network error: down");
    }
}
