//! Secret retrieval from a local `pass` password store.
//!
//! # Security invariants
//!
//! - Plaintext read from `pass` lives in a [`SecretValue`], which cannot be
//!   serialised, redacts itself in `Debug` output, and zeroes its buffer on
//!   drop. The copy handed to SSM is a [`Zeroizing`] string as well; buffers
//!   inside the AWS SDK are outside our control.
//! - Nothing is cached: every [`SecretSource::fetch`] runs the store again.

pub mod source;

pub use source::PassSecretSource;

use async_trait::async_trait;
use common::SyncError;
use zeroize::Zeroizing;

/// Plaintext secret bytes fetched from the local store.
pub struct SecretValue(Zeroizing<Vec<u8>>);

impl SecretValue {
    /// Wrap raw subprocess output, trimming exactly one trailing line terminator.
    pub fn from_output(mut bytes: Vec<u8>) -> Self {
        if bytes.ends_with(b"\r\n") {
            bytes.truncate(bytes.len() - 2);
        } else if bytes.ends_with(b"\n") {
            bytes.truncate(bytes.len() - 1);
        }
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Borrow the secret as UTF-8, as required for an SSM parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] if the secret is not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, SyncError> {
        std::str::from_utf8(self.as_bytes())
            .map_err(|_| SyncError::Validation("`pass` secret is not valid UTF-8".into()))
    }
}

impl From<&str> for SecretValue {
    fn from(s: &str) -> Self {
        Self(Zeroizing::new(s.as_bytes().to_vec()))
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

/// Anything that can produce the plaintext for a store directory and key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the secret stored under `pass_key`.
    ///
    /// An empty `pass_dir` selects the process default store.
    async fn fetch(&self, pass_dir: &str, pass_key: &str) -> Result<SecretValue, SyncError>;
}
