//! Caller identity resolution and account allow/deny checks.

use anyhow::{Context, Result};
use common::arn::Arn;
use common::{AwsIdentity, SyncError};
use tracing::{info, warn};

use super::AwsClients;
use crate::config::Config;

/// Resolve the account, partition and region every ARN is built from, and
/// enforce the configured account lists.
///
/// # Errors
///
/// Returns an error if STS cannot be reached, returns an unparseable ARN, or
/// the account is not allowed.
pub async fn resolve(clients: &AwsClients, cfg: &Config) -> Result<AwsIdentity> {
    let allowed = cfg.allowed_accounts();
    let forbidden = cfg.forbidden_accounts();

    if cfg.skip_requesting_account_id {
        warn!("AWS account id not requested; parameter ARNs will have an empty account id");
        validate_account_id("", &allowed, &forbidden)?;
        return Ok(AwsIdentity::new(
            "",
            partition_for_region(&clients.region),
            clients.region.clone(),
        ));
    }

    let resp = clients
        .sts
        .get_caller_identity()
        .send()
        .await
        .context("failed to get caller identity from STS")?;

    let raw = resp.arn().context("STS returned no caller ARN")?;
    let arn = Arn::parse(raw).with_context(|| format!("STS returned a malformed ARN: {raw}"))?;
    let account_id = resp.account().map_or(arn.account_id.clone(), str::to_owned);

    validate_account_id(&account_id, &allowed, &forbidden)?;
    info!(account_id = %account_id, partition = %arn.partition, region = %clients.region, "resolved AWS identity");

    Ok(AwsIdentity::new(account_id, arn.partition, clients.region.clone()))
}

/// Check `account_id` against the allowed / forbidden lists.
///
/// An empty list imposes no constraint. An unknown (empty) account id is never
/// forbidden, but is rejected whenever an allowed list is configured.
///
/// # Errors
///
/// Returns [`SyncError::Validation`] describing the violated list.
pub fn validate_account_id(
    account_id: &str,
    allowed: &[String],
    forbidden: &[String],
) -> Result<(), SyncError> {
    if forbidden.iter().any(|id| id == account_id) {
        return Err(SyncError::Validation(format!(
            "AWS account {account_id} is forbidden"
        )));
    }
    if !allowed.is_empty() && account_id.is_empty() {
        return Err(SyncError::Validation(
            "account id is unknown but allowed account ids are configured".into(),
        ));
    }
    if !allowed.is_empty() && !allowed.iter().any(|id| id == account_id) {
        return Err(SyncError::Validation(format!(
            "AWS account {account_id} is not in the allowed account ids"
        )));
    }
    Ok(())
}

/// Partition a region belongs to, for when STS is not consulted.
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else {
        "aws"
    }
}
