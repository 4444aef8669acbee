//! Notification contract
//!
//! The controller reports transient save status to the surrounding UI shell
//! and calls an on-success hook once, after the first successful create.

use std::fmt;
use std::sync::Arc;

/// Which operation a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// First create of the entity
    Create,
    /// Debounced or immediate update
    Update,
    /// Relation link or unlink
    Relation,
    /// Child editor flush during close
    ChildFlush,
    /// Delete after confirmation
    Delete,
}

impl FailureKind {
    /// Message shown to the user
    #[inline]
    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Create => "Failed to create",
            Self::Update => "Failed to save changes",
            Self::Relation => "Failed to update link",
            Self::ChildFlush => "Failed to save custom fields",
            Self::Delete => "Failed to delete",
        }
    }

    /// Blocking failures keep a dialog open until the user acts
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// Status emitted for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Create call started
    Creating,
    /// Update call started
    Saving,
    /// Last call succeeded
    Saved,
    /// Entity deleted
    Deleted,
    /// A call failed
    Error {
        /// Failed operation
        kind: FailureKind,
        /// Underlying error text
        detail: String,
    },
}

impl SaveStatus {
    /// Build an error status
    #[inline]
    pub fn error(kind: FailureKind, detail: impl fmt::Display) -> Self {
        Self::Error {
            kind,
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => f.write_str("creating"),
            Self::Saving => f.write_str("saving"),
            Self::Saved => f.write_str("saved"),
            Self::Deleted => f.write_str("deleted"),
            Self::Error { kind, detail } => write!(f, "{}: {detail}", kind.headline()),
        }
    }
}

/// Consumer of status updates
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Called for every status change of a panel of entity type `entity`
    fn notify(&self, entity: &'static str, status: &SaveStatus);
}

/// Default notifier: writes statuses to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, entity: &'static str, status: &SaveStatus) {
        match status {
            SaveStatus::Error { kind, .. } if kind.is_blocking() => {
                tracing::error!("[{}] {}", entity, status);
            }
            SaveStatus::Error { .. } => tracing::warn!("[{}] {}", entity, status),
            _ => tracing::debug!("[{}] {}", entity, status),
        }
    }
}

/// Hook called once with the entity returned by the first successful create
pub type SuccessCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;
