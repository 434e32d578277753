//! ARN composition for SSM parameters.
//!
//! Pure functions only: the caller supplies the account, partition and region
//! it resolved at startup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Account, partition and region the parameter store client is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsIdentity {
    /// AWS account id. Empty when account lookup was skipped.
    pub account_id: String,
    /// AWS partition (`aws`, `aws-cn`, `aws-us-gov`, ...).
    pub partition: String,
    /// AWS region (e.g. `eu-west-2`).
    pub region: String,
}

impl AwsIdentity {
    /// Construct an identity from its three components.
    pub fn new(
        account_id: impl Into<String>,
        partition: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            partition: partition.into(),
            region: region.into(),
        }
    }

    /// The ARN of the parameter called `name` under this identity.
    pub fn parameter_arn(&self, name: &str) -> Arn {
        Arn {
            partition: self.partition.clone(),
            service: "ssm".into(),
            region: self.region.clone(),
            account_id: self.account_id.clone(),
            resource: parameter_resource(name),
        }
    }
}

/// A structured Amazon Resource Name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    /// Parse `arn:<partition>:<service>:<region>:<account>:<resource>`.
    ///
    /// The resource part may itself contain `:`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let partition = parts.next()?;
        let service = parts.next()?;
        let region = parts.next()?;
        let account_id = parts.next()?;
        let resource = parts.next()?;
        if partition.is_empty() || service.is_empty() {
            return None;
        }
        Some(Self {
            partition: partition.to_owned(),
            service: service.to_owned(),
            region: region.to_owned(),
            account_id: account_id.to_owned(),
            resource: resource.to_owned(),
        })
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

/// `parameter/<name>` with a single leading `/` removed from hierarchical names.
fn parameter_resource(name: &str) -> String {
    format!("parameter/{}", name.strip_prefix('/').unwrap_or(name))
}
