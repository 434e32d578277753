//! Read-only lookup of an existing parameter.
//!
//! Unlike a binding, the lookup asks SSM not to decrypt the value and never
//! returns it: only the name, type and ARN come back.

use common::{AwsIdentity, SyncError};
use serde::Serialize;
use tracing::debug;

use crate::aws::ParameterStore;

/// Result of [`lookup_parameter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterLookup {
    pub parameter_name: String,
    #[serde(rename = "type")]
    pub parameter_type: Option<String>,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub arn: String,
}

/// Look up `name` without decryption.
///
/// # Errors
///
/// Any remote error, including [`SyncError::RemoteNotFound`].
pub async fn lookup_parameter<P: ParameterStore + ?Sized>(
    store: &P,
    identity: &AwsIdentity,
    name: &str,
) -> Result<ParameterLookup, SyncError> {
    debug!(name, "reading SSM parameter");
    let param = store.get(name, false).await?;
    Ok(ParameterLookup {
        arn: identity.parameter_arn(&param.name).to_string(),
        parameter_name: param.name,
        parameter_type: param.parameter_type,
        version: param.version,
        last_modified: param.last_modified,
    })
}
