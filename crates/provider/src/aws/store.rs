//! The remote parameter store as seen by the reconciler.
//!
//! [`ParameterStore`] is the seam between lifecycle logic and AWS. Production
//! code uses [`super::SsmParameterStore`]; tests use mocks or the in-memory
//! store in [`memory`].

use async_trait::async_trait;
use common::SyncError;
use zeroize::Zeroizing;

/// SSM type tag for KMS-encrypted values.
pub const SECURE_STRING: &str = "SecureString";

/// Metadata returned by a `GetParameter` call.
///
/// The value is never surfaced: callers only ever need to know that the
/// parameter exists and what type it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParameter {
    pub name: String,
    pub parameter_type: Option<String>,
    pub version: i64,
    pub last_modified: Option<String>,
}

/// Metadata returned by `DescribeParameters`; obtained without decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMetadata {
    pub name: String,
    pub parameter_type: Option<String>,
    pub key_id: Option<String>,
    pub description: Option<String>,
    pub last_modified: Option<String>,
}

/// Input for an upsert of one parameter.
#[derive(Clone, PartialEq, Eq)]
pub struct PutParameter {
    pub name: String,
    /// Plaintext value. Redacted from `Debug` output, zeroed on drop.
    pub value: Zeroizing<String>,
    pub parameter_type: &'static str,
    pub overwrite: bool,
    pub key_id: Option<String>,
    pub description: Option<String>,
}

impl PutParameter {
    /// An overwriting `SecureString` put.
    pub fn secure_string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Zeroizing::new(value.into()),
            parameter_type: SECURE_STRING,
            overwrite: true,
            key_id: None,
            description: None,
        }
    }
}

impl std::fmt::Debug for PutParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutParameter")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("parameter_type", &self.parameter_type)
            .field("overwrite", &self.overwrite)
            .field("key_id", &self.key_id)
            .field("description", &self.description)
            .finish()
    }
}

/// Keyed access to remote parameters.
///
/// Every method reports a missing parameter as [`SyncError::RemoteNotFound`]
/// and any other failure as [`SyncError::Remote`]; interpreting not-found as
/// benign is the caller's decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Look up a parameter. Pass `with_decryption = false` for a metadata-only call.
    async fn get(&self, name: &str, with_decryption: bool) -> Result<RemoteParameter, SyncError>;

    /// Describe a parameter without decrypting it.
    async fn describe(&self, name: &str) -> Result<ParameterMetadata, SyncError>;

    /// Create or overwrite a parameter.
    async fn put(&self, input: PutParameter) -> Result<(), SyncError>;

    async fn delete(&self, name: &str) -> Result<(), SyncError>;
}
