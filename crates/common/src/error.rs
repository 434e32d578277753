//! Common error types shared across crates.

use thiserror::Error;

/// Boxed error carried by [`SyncError::Remote`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for every binding lifecycle operation.
///
/// Every variant aborts the current operation. The reconciler treats
/// [`SyncError::RemoteNotFound`] as benign in exactly two places (Read clears
/// the binding id, Exists answers `false`); it is fatal everywhere else.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local `pass` subprocess could not be started or exited non-zero.
    ///
    /// `stderr` is whatever the subprocess wrote to its error stream. The
    /// subprocess's standard output is never captured here.
    #[error("error fetching `pass` secret {key:?} ({status}): {stderr}")]
    SecretRetrieval {
        key: String,
        status: String,
        stderr: String,
    },

    /// The named parameter does not exist in the remote store.
    #[error("parameter not found: {0}")]
    RemoteNotFound(String),

    /// Any other remote failure (transport, auth, throttling, service error).
    #[error("error calling {operation} on parameter store")]
    Remote {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// Configuration or binding validation failed before any remote call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The fingerprint key-derivation function rejected its inputs.
    #[error("fingerprint derivation failed: {0}")]
    Fingerprint(String),
}

impl SyncError {
    /// Wrap an opaque remote client failure for `operation`.
    pub fn remote(operation: &'static str, source: impl Into<BoxError>) -> Self {
        SyncError::Remote {
            operation,
            source: source.into(),
        }
    }

    /// Returns `true` if this error reports a missing remote parameter.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::RemoteNotFound(_))
    }
}
