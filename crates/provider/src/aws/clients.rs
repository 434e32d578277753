//! AWS SDK client bundle for SSM and STS.

use anyhow::{Context, Result};
use aws_config::{retry::RetryConfig, BehaviorVersion, Region};

use crate::config::{is_valid_region, Config};

/// Bundle of AWS SDK clients sharing one [`aws_config::SdkConfig`], so that
/// credentials are resolved once and reused.
#[derive(Clone, Debug)]
pub struct AwsClients {
    /// SSM client used for all parameter reads and writes.
    pub ssm: aws_sdk_ssm::Client,
    /// STS client used to resolve the caller's account and partition.
    pub sts: aws_sdk_sts::Client,
    /// Region the clients are bound to.
    pub region: String,
}

impl AwsClients {
    /// Initialise all AWS SDK clients.
    ///
    /// Credentials come from the standard AWS credential chain, optionally
    /// narrowed to `cfg.profile`. `cfg.ssm_endpoint` overrides the SSM
    /// endpoint only; STS always uses its regional default.
    ///
    /// # Errors
    ///
    /// Returns an error if no region can be resolved or the resolved region
    /// fails validation.
    pub async fn init(cfg: &Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).retry_config(
            RetryConfig::standard().with_max_attempts(cfg.max_retries.saturating_add(1)),
        );
        if let Some(region) = &cfg.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &cfg.profile {
            loader = loader.profile_name(profile);
        }
        let sdk = loader.load().await;

        let region = sdk
            .region()
            .map(|r| r.to_string())
            .context("no AWS region configured; set PASS_SSM_REGION or AWS_REGION")?;
        if !cfg.skip_region_validation && !is_valid_region(&region) {
            anyhow::bail!("{region:?} is not a valid AWS region name");
        }

        let mut ssm_conf = aws_sdk_ssm::config::Builder::from(&sdk);
        if let Some(endpoint) = &cfg.ssm_endpoint {
            ssm_conf = ssm_conf.endpoint_url(endpoint);
        }

        Ok(Self {
            ssm: aws_sdk_ssm::Client::from_conf(ssm_conf.build()),
            sts: aws_sdk_sts::Client::new(&sdk),
            region,
        })
    }
}
